//! DAO 에러 관리
//!
//! 쿼리 헬퍼에서 발생하는 모든 에러를 하나의 타입으로 정리합니다.
//! sqlx 에러는 `From` 변환으로 이 분류에 맞춰집니다.

use thiserror::Error;
use tracing::{error, info, warn};

/// Error taxonomy of the query layer.
///
/// Single-row contract violations (`EmptyResult`, `MultipleResults`) and
/// shaping failures are raised by this crate; the connection/query variants
/// carry failures surfaced by the database client.
#[derive(Error, Debug, Clone)]
pub enum DaoError {
    // 단일 행 조회 계약 위반
    #[error("empty result: expected exactly one row, got none")]
    EmptyResult,

    #[error("incorrect result size: expected exactly one row, got {actual}")]
    MultipleResults { actual: usize },

    // 결과 변환 에러
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    // 데이터베이스 클라이언트 에러
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    #[error("timeout: {0}")]
    Timeout(String),

    // 설정 / 입력값 에러
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Either sub-query of a paged query failed.
    #[error("page query failed: {source}")]
    PageQuery {
        #[source]
        source: Box<DaoError>,
    },
}

impl DaoError {
    /// Wraps a failure raised while building a page.
    pub fn page_query(source: DaoError) -> Self {
        DaoError::PageQuery {
            source: Box::new(source),
        }
    }

    /// 에러의 심각도를 반환합니다.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DaoError::DatabaseConnection(_) | DaoError::Configuration(_) => {
                ErrorSeverity::Critical
            }

            DaoError::DatabaseQuery(_) | DaoError::Timeout(_) | DaoError::MultipleResults { .. } => {
                ErrorSeverity::High
            }

            DaoError::ShapeMismatch(_) | DaoError::InvalidInput(_) => ErrorSeverity::Medium,

            DaoError::EmptyResult => ErrorSeverity::Low,

            DaoError::PageQuery { source } => source.severity(),
        }
    }

    /// 심각도에 맞는 로깅 레벨로 에러를 기록합니다.
    pub fn log(&self, context: &str) {
        match self.severity() {
            ErrorSeverity::Critical => error!("[CRITICAL] {} - {}", context, self),
            ErrorSeverity::High => error!("[HIGH] {} - {}", context, self),
            ErrorSeverity::Medium => warn!("[MEDIUM] {} - {}", context, self),
            ErrorSeverity::Low => info!("[LOW] {} - {}", context, self),
        }
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical, // 연결 / 설정 장애
    High,     // 쿼리 실패
    Medium,   // 입력값 / 변환 오류
    Low,      // 빈 결과
}

impl From<sqlx::Error> for DaoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DaoError::DatabaseQuery(db_err.to_string()),
            sqlx::Error::PoolTimedOut => {
                DaoError::Timeout("database connection pool timeout".to_string())
            }
            sqlx::Error::PoolClosed => {
                DaoError::DatabaseConnection("database pool is closed".to_string())
            }
            sqlx::Error::Io(io_err) => DaoError::DatabaseConnection(io_err.to_string()),
            sqlx::Error::Tls(tls_err) => DaoError::DatabaseConnection(tls_err.to_string()),
            sqlx::Error::Protocol(msg) => DaoError::DatabaseConnection(msg),
            sqlx::Error::Configuration(cfg_err) => DaoError::Configuration(cfg_err.to_string()),
            sqlx::Error::ColumnNotFound(column) => {
                DaoError::DatabaseQuery(format!("column '{column}' not found"))
            }
            other => DaoError::DatabaseQuery(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_page_query_keeps_cause() {
        let err = DaoError::page_query(DaoError::DatabaseQuery("syntax error".to_string()));

        let source = err.source().expect("cause attached");
        assert_eq!(source.to_string(), "database query failed: syntax error");
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(
            DaoError::DatabaseConnection("refused".to_string()).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(DaoError::EmptyResult.severity(), ErrorSeverity::Low);
        assert_eq!(
            DaoError::page_query(DaoError::MultipleResults { actual: 2 }).severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_sqlx_error_conversion() {
        assert!(matches!(
            DaoError::from(sqlx::Error::PoolTimedOut),
            DaoError::Timeout(_)
        ));
        assert!(matches!(
            DaoError::from(sqlx::Error::PoolClosed),
            DaoError::DatabaseConnection(_)
        ));
        assert!(matches!(
            DaoError::from(sqlx::Error::RowNotFound),
            DaoError::DatabaseQuery(_)
        ));
    }
}
