//! 쿼리 / 연결 풀 설정 모듈
//!
//! 실행기와 MySQL 클라이언트가 사용하는 설정 값을 관리

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// 쿼리 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// 쿼리 로깅 활성화
    pub enable_query_logging: bool,

    /// 느린 쿼리 로깅 (임계값: ms)
    pub slow_query_threshold_ms: u64,

    /// 기본 쿼리 타임아웃
    pub default_timeout: Duration,
}

/// 연결 풀 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 풀의 최소 연결 수
    pub min_connections: u32,

    /// 풀의 최대 연결 수
    pub max_connections: u32,

    /// 연결 타임아웃
    pub connect_timeout: Duration,

    /// 유휴 연결 타임아웃
    pub idle_timeout: Duration,

    /// 최대 연결 수명
    pub max_lifetime: Duration,
}

impl QueryConfig {
    /// Defaults overridden by `DB_QUERY_LOGGING`, `DB_SLOW_QUERY_MS` and
    /// `DB_QUERY_TIMEOUT_SECS`. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("DB_QUERY_LOGGING") {
            config.enable_query_logging = matches!(val.to_lowercase().as_str(), "true" | "1");
        }

        if let Some(val) = lookup("DB_SLOW_QUERY_MS") {
            match val.parse() {
                Ok(ms) => config.slow_query_threshold_ms = ms,
                Err(_) => warn!("DB_SLOW_QUERY_MS 값이 숫자가 아닙니다: {}", val),
            }
        }

        if let Some(val) = lookup("DB_QUERY_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.default_timeout = Duration::from_secs(secs),
                Err(_) => warn!("DB_QUERY_TIMEOUT_SECS 값이 숫자가 아닙니다: {}", val),
            }
        }

        config
    }

    /// Builder method for the slow query threshold
    pub fn with_slow_query_threshold(mut self, threshold_ms: u64) -> Self {
        self.slow_query_threshold_ms = threshold_ms;
        self
    }

    /// Builder method for the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn without_query_logging(mut self) -> Self {
        self.enable_query_logging = false;
        self
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            enable_query_logging: true,
            slow_query_threshold_ms: 1000,
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 5,
            max_connections: 100,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_query_config_defaults() {
        let config = QueryConfig::default();
        assert!(config.enable_query_logging);
        assert_eq!(config.slow_query_threshold_ms, 1000);
        assert_eq!(config.default_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_query_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DB_QUERY_LOGGING", "false"),
            ("DB_SLOW_QUERY_MS", "250"),
            ("DB_QUERY_TIMEOUT_SECS", "abc"),
        ]
        .into_iter()
        .collect();

        let config = QueryConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert!(!config.enable_query_logging);
        assert_eq!(config.slow_query_threshold_ms, 250);
        // 잘못된 값은 기본값 유지
        assert_eq!(config.default_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_query_config_builders() {
        let config = QueryConfig::default()
            .with_slow_query_threshold(50)
            .with_timeout(Duration::from_secs(3))
            .without_query_logging();

        assert_eq!(config.slow_query_threshold_ms, 50);
        assert_eq!(config.default_timeout, Duration::from_secs(3));
        assert!(!config.enable_query_logging);
    }
}
