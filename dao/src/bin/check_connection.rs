//! 데이터베이스 연결 확인 도구
//!
//! .env 설정으로 연결 풀을 만들고 방언의 확인 쿼리를 실행합니다.

use anyhow::Result;
use dao::{
    ConnectionProbe, DbConfig, DialectRegistry, MySqlClient, PoolConfig, QueryConfig,
    QueryExecutor,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 로깅 초기화
    let filter = EnvFilter::from_default_env().add_directive(
        "info"
            .parse()
            .map_err(|e| anyhow::anyhow!("로깅 설정 파싱 실패: {e}"))?,
    );
    fmt().with_env_filter(filter).init();

    let config = DbConfig::from_env()?;
    info!("설정 로드 완료: {:?}", config);

    let dialect = config.dialect(&DialectRegistry::new())?;

    let query_config = QueryConfig::from_env();

    let client = match MySqlClient::connect(&config, &PoolConfig::default(), query_config.clone()).await {
        Ok(client) => client,
        Err(e) => {
            e.log("데이터베이스 연결");
            std::process::exit(1);
        }
    };

    let executor = QueryExecutor::new(Arc::new(client.clone()), dialect)
        .with_config(query_config);

    let outcome = ConnectionProbe::new(executor).run().await;
    client.close().await;

    match outcome {
        Ok(answer) => {
            info!("✅ {}", answer);
            Ok(())
        }
        Err(e) => {
            error!("❌ 연결 확인 실패");
            e.log("연결 확인");
            std::process::exit(1);
        }
    }
}
