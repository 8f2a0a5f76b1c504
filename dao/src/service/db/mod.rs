//! 데이터베이스 서비스 모듈
//!
//! MariaDB/MySQL(및 Oracle 방언) 쿼리 헬퍼를 제공합니다.

// 핵심 모듈 (방언, 결과 변환, 실행기, 클라이언트)
pub mod core;
// 연결 확인
pub mod probe;

pub use core::{
    // 설정 관련
    config::{PoolConfig, QueryConfig},
    // 클라이언트
    client::DatabaseClient,
    connection::MySqlClient,
    // 방언
    dialect::{Dialect, DialectRegistry, MysqlDialect, OracleDialect},
    // 쿼리 실행
    executor::QueryExecutor,
    page::Page,
    shape::{FromRow, Record, RecordDescriptor, ResultShaper, ScalarType, Shape, Shaped},
    // 데이터 타입들
    types::{ProcedureParam, Row, SqlType, SqlValue},
};
pub use probe::ConnectionProbe;
