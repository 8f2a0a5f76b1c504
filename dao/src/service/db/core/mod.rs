//! Core database service modules
//!
//! 방언, 결과 변환, 페이지, 클라이언트, 실행기로 나뉜 핵심 컴포넌트

pub mod client;
pub mod config;
pub mod connection;
mod de;
pub mod dialect;
pub mod executor;
pub mod page;
pub mod shape;
pub mod types;

pub use client::DatabaseClient;
pub use config::{PoolConfig, QueryConfig};
pub use connection::MySqlClient;
pub use dialect::{Dialect, DialectRegistry, MysqlDialect, OracleDialect};
pub use executor::QueryExecutor;
pub use page::Page;
pub use shape::{FromRow, Record, RecordDescriptor, ResultShaper, ScalarType, Shape, Shaped};
pub use types::{ProcedureParam, Row, SqlType, SqlValue};
