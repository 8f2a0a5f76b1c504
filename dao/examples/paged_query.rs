//! Paged query usage example
//!
//! .env 설정으로 연결한 뒤 단일 행 조회, 목록, 페이지 조회를 보여줍니다.

use dao::{
    params, DbConfig, DialectRegistry, MySqlClient, Page, PoolConfig, ProcedureParam, QueryConfig,
    QueryExecutor, Record, Row, SqlType,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct User {
    id: i64,
    #[serde(rename = "userName")]
    user_name: String,
}

impl Record for User {
    const TYPE_NAME: &'static str = "User";
    const FIELDS: &'static [&'static str] = &["id", "userName"];
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // ========== 1. 연결 ==========
    let config = DbConfig::from_env()?;
    let dialect = config.dialect(&DialectRegistry::new())?;
    let query_config = QueryConfig::from_env().with_slow_query_threshold(500);
    let client = MySqlClient::connect(&config, &PoolConfig::default(), query_config.clone()).await?;
    let executor = QueryExecutor::new(Arc::new(client.clone()), dialect).with_config(query_config);

    // ========== 2. 단일 행 ==========
    let total: i64 = executor.query_object("SELECT COUNT(*) FROM users", &[]).await?;
    println!("users: {total}");

    let user: Option<User> = executor
        .query_object_or_null("SELECT id, user_name FROM users WHERE id = ?", &params![1])
        .await?;
    println!("user 1: {user:?}");

    // ========== 3. 페이지 ==========
    let page: Page<User> = executor
        .query_page("SELECT id, user_name FROM users ORDER BY id", &[], 2, 10)
        .await?;
    println!(
        "page {}/{} ({} rows, total {})",
        page.current_page(),
        page.page_count(),
        page.list().len(),
        page.total_count()
    );
    println!("{}", serde_json::to_string_pretty(&page.map(|u| u.user_name))?);

    // ========== 4. 일반 맵 / 프로시저 ==========
    let rows: Vec<Row> = executor
        .query_list_window("SELECT * FROM users ORDER BY id", &[], 0, 5)
        .await?;
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }

    let out = executor
        .call_procedure(
            "{call count_users(?, ?)}",
            &[ProcedureParam::input("active"), ProcedureParam::output(SqlType::Integer)],
        )
        .await?;
    println!("count_users OUT: {:?}", out.get(1));

    client.close().await;
    Ok(())
}
