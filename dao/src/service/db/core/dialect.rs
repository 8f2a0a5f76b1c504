//! SQL 방언 모듈
//!
//! 데이터베이스별 페이지 쿼리 문법과 연결 확인 쿼리를 제공합니다.

use crate::tool::error::DaoError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Database-specific SQL rewriting for row windows.
pub trait Dialect: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Wraps `sql` so that it returns the rows after `start` up to `end`.
    fn page_query(&self, sql: &str, start: u64, end: u64) -> String;

    /// Cheap query used to check that the database answers.
    fn probe_query(&self) -> &'static str;

    /// Wraps `sql` in a row count.
    fn count_query(&self, sql: &str) -> String {
        format!("SELECT COUNT(1) FROM ({sql}) AS t")
    }
}

impl fmt::Debug for dyn Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dialect({})", self.name())
    }
}

/// MySQL / MariaDB `LIMIT offset , count` paging.
///
/// By default the window end is passed through as the LIMIT count, so
/// page N of size S reads `LIMIT (N-1)*S , N*S`. For `start > 0` this
/// returns up to `end` rows instead of `end - start`;
/// [`MysqlDialect::strict`] emits the row count.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect {
    strict_window: bool,
}

impl MysqlDialect {
    pub fn new() -> Self {
        Self::default()
    }

    /// LIMIT count computed as `end - start`.
    pub fn strict() -> Self {
        Self { strict_window: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict_window
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        if self.strict_window {
            "mysql-strict"
        } else {
            "mysql"
        }
    }

    fn page_query(&self, sql: &str, start: u64, end: u64) -> String {
        let count = if self.strict_window {
            end.saturating_sub(start)
        } else {
            end
        };
        format!("SELECT * FROM  (  {sql} ) _A LIMIT {start} , {count}")
    }

    fn probe_query(&self) -> &'static str {
        "select 'mysql connection OK'"
    }
}

/// Oracle top-N-then-filter paging on `ROWNUM`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn page_query(&self, sql: &str, start: u64, end: u64) -> String {
        format!(
            "SELECT * FROM  ( SELECT A.*, ROWNUM RN FROM ( {sql} ) A WHERE ROWNUM <= {end} ) WHERE RN > {start}"
        )
    }

    fn probe_query(&self) -> &'static str {
        "select 'Oracle connection OK!' from dual"
    }

    // Oracle does not accept AS before a table alias.
    fn count_query(&self, sql: &str) -> String {
        format!("SELECT COUNT(1) FROM ({sql}) t")
    }
}

/// Maps a database-kind key (`db_kind`) to its dialect.
#[derive(Clone)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DialectRegistry {
    /// Registry without any dialect.
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Registry with the built-in dialects.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("mysql", Arc::new(MysqlDialect::new()));
        registry.register("mariadb", Arc::new(MysqlDialect::new()));
        registry.register("mysql-strict", Arc::new(MysqlDialect::strict()));
        registry.register("oracle", Arc::new(OracleDialect));
        registry
    }

    /// Adds or replaces the dialect for `kind`. Keys are case-insensitive.
    pub fn register(&mut self, kind: &str, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(kind.trim().to_ascii_lowercase(), dialect);
    }

    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn Dialect>, DaoError> {
        self.dialects
            .get(&kind.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                DaoError::Configuration(format!("unknown database kind '{kind}'"))
            })
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_page_query_passes_end_as_count() {
        let sql = MysqlDialect::new().page_query("SELECT * FROM t", 10, 15);
        assert_eq!(sql, "SELECT * FROM  (  SELECT * FROM t ) _A LIMIT 10 , 15");
    }

    #[test]
    fn test_mysql_strict_page_query_uses_row_count() {
        let dialect = MysqlDialect::strict();
        assert!(dialect.is_strict());
        assert!(!MysqlDialect::new().is_strict());

        let sql = dialect.page_query("SELECT * FROM t", 10, 15);
        assert_eq!(sql, "SELECT * FROM  (  SELECT * FROM t ) _A LIMIT 10 , 5");
    }

    #[test]
    fn test_oracle_page_query() {
        let sql = OracleDialect.page_query("SELECT * FROM t", 10, 15);
        assert!(sql.contains("( SELECT * FROM t )"));
        assert!(sql.contains("ROWNUM <= 15"));
        assert!(sql.ends_with("WHERE RN > 10"));
        assert!(sql.find("ROWNUM <= 15") < sql.find("RN > 10"));
    }

    #[test]
    fn test_count_queries() {
        assert_eq!(
            MysqlDialect::new().count_query("SELECT * FROM users"),
            "SELECT COUNT(1) FROM (SELECT * FROM users) AS t"
        );
        assert_eq!(
            OracleDialect.count_query("SELECT * FROM users"),
            "SELECT COUNT(1) FROM (SELECT * FROM users) t"
        );
    }

    #[test]
    fn test_probe_queries() {
        assert_eq!(MysqlDialect::new().probe_query(), "select 'mysql connection OK'");
        assert!(OracleDialect.probe_query().ends_with("from dual"));
    }

    #[test]
    fn test_registry_resolves_builtin_kinds() {
        let registry = DialectRegistry::new();

        assert_eq!(registry.resolve("MySQL").unwrap().name(), "mysql");
        assert_eq!(registry.resolve("mariadb").unwrap().name(), "mysql");
        assert_eq!(registry.resolve(" oracle ").unwrap().name(), "oracle");
        assert_eq!(registry.resolve("mysql-strict").unwrap().name(), "mysql-strict");
    }

    #[test]
    fn test_registry_unknown_kind() {
        let err = DialectRegistry::new().resolve("db2").unwrap_err();
        assert!(matches!(err, DaoError::Configuration(_)));
    }

    #[test]
    fn test_registry_custom_dialect() {
        struct PostgresDialect;

        impl Dialect for PostgresDialect {
            fn name(&self) -> &'static str {
                "postgres"
            }

            fn page_query(&self, sql: &str, start: u64, end: u64) -> String {
                format!("{sql} LIMIT {} OFFSET {start}", end - start)
            }

            fn probe_query(&self) -> &'static str {
                "SELECT 1"
            }
        }

        let mut registry = DialectRegistry::empty();
        registry.register("Postgres", Arc::new(PostgresDialect));

        let dialect = registry.resolve("postgres").unwrap();
        assert_eq!(dialect.page_query("SELECT 1", 20, 30), "SELECT 1 LIMIT 10 OFFSET 20");
        assert_eq!(registry.kinds(), vec!["postgres"]);
    }
}
