//! MySQL 연결 모듈
//!
//! sqlx MySQL 연결 풀 위에서 `DatabaseClient` 기능을 구현합니다.
//! 연결, 트랜잭션 같은 호출 단위 자원은 호출 안에서 획득하고 모든 종료 경로에서 반환됩니다.

use crate::config::db::DbConfig;
use crate::service::db::core::client::DatabaseClient;
use crate::service::db::core::config::{PoolConfig, QueryConfig};
use crate::service::db::core::types::{ProcedureParam, Row, SqlValue};
use crate::tool::error::DaoError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as _, TypeInfo};
use std::future::Future;
use tracing::{debug, error, info, warn};

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Prefix of the session variables that receive OUT parameters.
const OUT_VAR_PREFIX: &str = "@_dao_out_";

/// `DatabaseClient` backed by a sqlx MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlClient {
    pool: MySqlPool,
    config: QueryConfig,
}

impl MySqlClient {
    pub fn new(pool: MySqlPool, config: QueryConfig) -> Self {
        Self { pool, config }
    }

    /// Opens a pool for `db_config` with the given pool settings.
    pub async fn connect(
        db_config: &DbConfig,
        pool_config: &PoolConfig,
        query_config: QueryConfig,
    ) -> Result<Self, DaoError> {
        if !db_config.is_mysql() {
            return Err(DaoError::Configuration(format!(
                "db_kind '{}' cannot be served by the MySQL client",
                db_config.kind
            )));
        }

        info!(
            "데이터베이스 연결 시도: {}:{}@{}/{}",
            db_config.user, "***", db_config.host, db_config.database
        );

        let pool = MySqlPoolOptions::new()
            .min_connections(pool_config.min_connections)
            .max_connections(pool_config.max_connections)
            .acquire_timeout(pool_config.connect_timeout)
            .idle_timeout(pool_config.idle_timeout)
            .max_lifetime(pool_config.max_lifetime)
            .connect(&db_config.database_url())
            .await?;

        info!("MySQL 연결 풀 생성 완료: {}:{}", db_config.host, db_config.port);
        Ok(Self::new(pool, query_config))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Gracefully close all connections
    pub async fn close(&self) {
        info!("데이터베이스 연결 풀을 닫는 중...");
        self.pool.close().await;
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, DaoError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.config.default_timeout, fut).await {
            Ok(result) => result.map_err(DaoError::from),
            Err(_) => {
                warn!("{} timed out after {:?}", what, self.config.default_timeout);
                Err(DaoError::Timeout(format!(
                    "{} timed out after {:?}",
                    what, self.config.default_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DaoError> {
        let result = self
            .bounded("execute", bind_all(sqlx::query(sql), params).execute(&self.pool))
            .await?;
        Ok(result.rows_affected())
    }

    async fn execute_batch(&self, sql: &str, batches: &[Vec<SqlValue>]) -> Result<Vec<u64>, DaoError> {
        let pool = &self.pool;
        let work = async move {
            let mut tx = pool.begin().await?;
            let mut counts = Vec::with_capacity(batches.len());

            for (index, params) in batches.iter().enumerate() {
                match bind_all(sqlx::query(sql), params).execute(&mut *tx).await {
                    Ok(result) => counts.push(result.rows_affected()),
                    Err(e) => {
                        warn!("Batch statement {} failed, rolling back: {}", index, e);
                        return Err(rollback_after(tx.rollback(), e).await);
                    }
                }
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(counts)
        };

        self.bounded("batch execute", work).await
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DaoError> {
        let rows = self
            .bounded("query", bind_all(sqlx::query(sql), params).fetch_all(&self.pool))
            .await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn call(&self, sql: &str, params: &[ProcedureParam]) -> Result<Vec<Option<String>>, DaoError> {
        let statement = normalize_call(sql);
        let (rewritten, out_vars) = rewrite_out_placeholders(&statement, params)?;

        let in_values: Vec<SqlValue> = params
            .iter()
            .filter_map(|p| match p {
                ProcedureParam::In(value) => Some(value.clone()),
                ProcedureParam::Out(_) => None,
            })
            .collect();
        let registered: Vec<String> = out_vars.iter().flatten().cloned().collect();

        for (position, param) in params.iter().enumerate() {
            if let ProcedureParam::Out(sql_type) = param {
                debug!("OUT parameter {} registered as type {}", position + 1, sql_type.code());
            }
        }

        let pool = &self.pool;
        let work = async move {
            // 세션 변수는 연결 단위이므로 하나의 연결에서 모두 실행
            let mut conn = pool.acquire().await?;

            if !registered.is_empty() {
                let reset = registered
                    .iter()
                    .map(|var| format!("{var} = NULL"))
                    .collect::<Vec<_>>()
                    .join(", ");
                sqlx::query(&format!("SET {reset}")).execute(&mut *conn).await?;
            }

            bind_all(sqlx::query(&rewritten), &in_values)
                .execute(&mut *conn)
                .await?;

            let mut values = Vec::with_capacity(registered.len());
            if !registered.is_empty() {
                let select = registered
                    .iter()
                    .map(|var| format!("CAST({var} AS CHAR)"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let row = sqlx::query(&format!("SELECT {select}"))
                    .fetch_one(&mut *conn)
                    .await?;
                for index in 0..registered.len() {
                    values.push(row.try_get::<Option<String>, _>(index)?);
                }
            }

            Ok::<_, sqlx::Error>(values)
        };

        let mut out_values = self.bounded("procedure call", work).await?.into_iter();
        Ok(out_vars
            .iter()
            .map(|var| var.as_ref().and_then(|_| out_values.next().flatten()))
            .collect())
    }
}

/// Runs `rollback` and returns the statement error that caused it. A failed
/// rollback is only logged.
async fn rollback_after<F>(rollback: F, cause: sqlx::Error) -> sqlx::Error
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    if let Err(rollback_err) = rollback.await {
        error!("Batch rollback failed: {}", rollback_err);
    }
    cause
}

fn bind_all<'q>(mut query: MySqlQuery<'q>, params: &[SqlValue]) -> MySqlQuery<'q> {
    for value in params {
        query = bind_value(query, value);
    }
    query
}

fn bind_value<'q>(query: MySqlQuery<'q>, value: &SqlValue) -> MySqlQuery<'q> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::UInt(u) => query.bind(*u),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Decimal(d) => query.bind(*d),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Bytes(b) => query.bind(b.clone()),
        SqlValue::Date(d) => query.bind(*d),
        SqlValue::Time(t) => query.bind(*t),
        SqlValue::Timestamp(ts) => query.bind(*ts),
    }
}

/// Convert a MySQL row to a `Row`, keeping column order
fn decode_row(row: &MySqlRow) -> Row {
    let mut result = Row::with_capacity(row.columns().len());

    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = decode_column(row, index, type_name);
        result.insert(column.name(), value);
    }

    result
}

/// Rust type a MySQL column is decoded through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnDecode {
    Bool,
    Year,
    Unsigned,
    Signed,
    Float,
    Double,
    Decimal,
    Date,
    Time,
    DateTime,
    Binary,
    Text,
}

fn column_decode(type_name: &str) -> ColumnDecode {
    match type_name {
        "BOOLEAN" => ColumnDecode::Bool,
        // YEAR는 sqlx에서 u16으로만 디코딩됨
        "YEAR" => ColumnDecode::Year,
        name if name.ends_with("UNSIGNED") => ColumnDecode::Unsigned,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => ColumnDecode::Signed,
        "FLOAT" => ColumnDecode::Float,
        "DOUBLE" => ColumnDecode::Double,
        "DECIMAL" => ColumnDecode::Decimal,
        "DATE" => ColumnDecode::Date,
        "TIME" => ColumnDecode::Time,
        "DATETIME" | "TIMESTAMP" => ColumnDecode::DateTime,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            ColumnDecode::Binary
        }
        _ => ColumnDecode::Text,
    }
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> SqlValue {
    let decoded = match column_decode(type_name) {
        ColumnDecode::Bool => get::<bool>(row, index).map(|v| v.map(SqlValue::Bool)),
        ColumnDecode::Year => get::<u16>(row, index).map(|v| v.map(|y| SqlValue::Int(y.into()))),
        ColumnDecode::Unsigned => get::<u64>(row, index).map(|v| v.map(SqlValue::UInt)),
        ColumnDecode::Signed => get::<i64>(row, index).map(|v| v.map(SqlValue::Int)),
        ColumnDecode::Float => {
            get::<f32>(row, index).map(|v| v.map(|f| SqlValue::Float(f.into())))
        }
        ColumnDecode::Double => get::<f64>(row, index).map(|v| v.map(SqlValue::Float)),
        ColumnDecode::Decimal => get::<Decimal>(row, index).map(|v| v.map(SqlValue::Decimal)),
        ColumnDecode::Date => get::<NaiveDate>(row, index).map(|v| v.map(SqlValue::Date)),
        ColumnDecode::Time => get::<NaiveTime>(row, index).map(|v| v.map(SqlValue::Time)),
        ColumnDecode::DateTime => {
            get::<NaiveDateTime>(row, index).map(|v| v.map(SqlValue::Timestamp))
        }
        ColumnDecode::Binary => get::<Vec<u8>>(row, index).map(|v| v.map(SqlValue::Bytes)),
        ColumnDecode::Text => get::<String>(row, index).map(|v| v.map(SqlValue::Text)),
    };

    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => SqlValue::Null,
        Err(e) => {
            // 알 수 없는 타입은 문자열, 바이트 순으로 시도
            if let Ok(Some(text)) = get::<String>(row, index) {
                return SqlValue::Text(text);
            }
            if let Ok(Some(bytes)) = get::<Vec<u8>>(row, index) {
                return SqlValue::Bytes(bytes);
            }
            warn!("Column {} ({}) could not be decoded: {}", index, type_name, e);
            SqlValue::Null
        }
    }
}

fn get<'r, T>(row: &'r MySqlRow, index: usize) -> Result<Option<T>, sqlx::Error>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index)
}

/// Accepts the JDBC escape form `{call proc(?, ?)}` and returns `CALL proc(?, ?)`.
pub(crate) fn normalize_call(sql: &str) -> String {
    let trimmed = sql.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(trimmed);

    match inner.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("call ") => format!("CALL {}", &inner[5..]),
        _ => inner.to_string(),
    }
}

/// Replaces the `?` of every OUT position with a session variable.
///
/// Returns the rewritten statement and, per parameter position, the variable
/// holding its OUT value (`None` for IN positions). Placeholders inside quoted
/// literals or identifiers are not counted.
pub(crate) fn rewrite_out_placeholders(
    sql: &str,
    params: &[ProcedureParam],
) -> Result<(String, Vec<Option<String>>), DaoError> {
    let mut rewritten = String::with_capacity(sql.len() + params.len() * 12);
    let mut out_vars = vec![None; params.len()];
    let mut quote: Option<char> = None;
    let mut position = 0usize;

    for c in sql.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                rewritten.push(c);
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    rewritten.push(c);
                }
                '?' => {
                    match params.get(position) {
                        Some(ProcedureParam::Out(_)) => {
                            let var = format!("{}{}", OUT_VAR_PREFIX, position + 1);
                            rewritten.push_str(&var);
                            out_vars[position] = Some(var);
                        }
                        Some(ProcedureParam::In(_)) => rewritten.push('?'),
                        None => {
                            return Err(DaoError::InvalidInput(format!(
                                "statement has more placeholders than the {} procedure parameters",
                                params.len()
                            )))
                        }
                    }
                    position += 1;
                }
                _ => rewritten.push(c),
            },
        }
    }

    if position != params.len() {
        return Err(DaoError::InvalidInput(format!(
            "statement has {} placeholders but {} procedure parameters were given",
            position,
            params.len()
        )));
    }

    Ok((rewritten, out_vars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::db::core::types::SqlType;

    #[test]
    fn test_normalize_call() {
        assert_eq!(normalize_call("{call add_user(?, ?)}"), "CALL add_user(?, ?)");
        assert_eq!(normalize_call("  { CALL p() } "), "CALL p()");
        assert_eq!(normalize_call("call p(?)"), "CALL p(?)");
        assert_eq!(normalize_call("CALL p(?)"), "CALL p(?)");
    }

    #[test]
    fn test_rewrite_out_placeholders() {
        let params = vec![
            ProcedureParam::input(1),
            ProcedureParam::output(SqlType::Varchar),
            ProcedureParam::input("x"),
            ProcedureParam::output(SqlType::Integer),
        ];

        let (sql, vars) = rewrite_out_placeholders("CALL p(?, ?, ?, ?)", &params).unwrap();

        assert_eq!(sql, "CALL p(?, @_dao_out_2, ?, @_dao_out_4)");
        assert_eq!(
            vars,
            vec![
                None,
                Some("@_dao_out_2".to_string()),
                None,
                Some("@_dao_out_4".to_string()),
            ]
        );
    }

    #[test]
    fn test_rewrite_ignores_quoted_question_marks() {
        let params = vec![ProcedureParam::output(SqlType::Varchar)];

        let (sql, _) = rewrite_out_placeholders("CALL p('what?', ?)", &params).unwrap();
        assert_eq!(sql, "CALL p('what?', @_dao_out_1)");
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_statement_error() {
        let cause = sqlx::Error::Protocol("duplicate entry".to_string());
        let rollback = async { Err(sqlx::Error::PoolClosed) };

        let err = rollback_after(rollback, cause).await;
        assert!(matches!(err, sqlx::Error::Protocol(ref msg) if msg == "duplicate entry"));

        let err = rollback_after(async { Ok(()) }, sqlx::Error::RowNotFound).await;
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_column_decode_routing() {
        assert_eq!(column_decode("YEAR"), ColumnDecode::Year);
        assert_eq!(column_decode("INT UNSIGNED"), ColumnDecode::Unsigned);
        assert_eq!(column_decode("BIGINT"), ColumnDecode::Signed);
        assert_eq!(column_decode("DECIMAL"), ColumnDecode::Decimal);
        assert_eq!(column_decode("LONGBLOB"), ColumnDecode::Binary);
        assert_eq!(column_decode("VARCHAR"), ColumnDecode::Text);
    }

    #[tokio::test]
    async fn test_connect_rejects_non_mysql_kind() {
        let config = DbConfig {
            kind: "oracle".to_string(),
            host: "localhost".to_string(),
            port: 1521,
            user: "scott".to_string(),
            password: "tiger".to_string(),
            database: "orcl".to_string(),
        };

        let err = MySqlClient::connect(&config, &PoolConfig::default(), QueryConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::Configuration(_)));
    }

    #[test]
    fn test_rewrite_rejects_count_mismatch() {
        let params = vec![ProcedureParam::input(1)];

        assert!(matches!(
            rewrite_out_placeholders("CALL p(?, ?)", &params),
            Err(DaoError::InvalidInput(_))
        ));
        assert!(matches!(
            rewrite_out_placeholders("CALL p()", &params),
            Err(DaoError::InvalidInput(_))
        ));
    }
}
