//! 범용 쿼리 / 페이지네이션 DAO
//!
//! 데이터베이스 방언별 페이지 쿼리, 결과 변환, 단일 행 계약을 제공하는 쿼리 헬퍼입니다.
//!
//! ```no_run
//! use dao::{params, DbConfig, DialectRegistry, MySqlClient, Page, PoolConfig, QueryConfig, QueryExecutor, Row};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), dao::DaoError> {
//! let config = DbConfig::from_env()?;
//! let dialect = config.dialect(&DialectRegistry::new())?;
//! let client = MySqlClient::connect(&config, &PoolConfig::default(), QueryConfig::from_env()).await?;
//! let executor = QueryExecutor::new(Arc::new(client), dialect);
//!
//! let page: Page<Row> = executor
//!     .query_page("SELECT * FROM users WHERE active = ?", &params![true], 2, 10)
//!     .await?;
//! println!("{} / {}", page.current_page(), page.page_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod service;
pub mod tool;

pub use config::DbConfig;
pub use service::db::{
    ConnectionProbe, DatabaseClient, Dialect, DialectRegistry, FromRow, MySqlClient, MysqlDialect,
    OracleDialect, Page, PoolConfig, ProcedureParam, QueryConfig, QueryExecutor, Record,
    RecordDescriptor, ResultShaper, Row, ScalarType, Shape, Shaped, SqlType, SqlValue,
};
pub use tool::error::{DaoError, ErrorSeverity};
