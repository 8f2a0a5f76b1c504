//! Database Configuration
//!
//! .env 파일에서 데이터베이스 연결 정보와 데이터베이스 종류(`db_kind`)를 읽어옵니다.
//! 연결 풀 생성은 `MySqlClient::connect`가 담당합니다.

use crate::service::db::core::dialect::{Dialect, DialectRegistry};
use crate::tool::error::DaoError;
use dotenv::dotenv;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 데이터베이스 연결 설정 구조체
#[derive(Clone)]
pub struct DbConfig {
    /// Dialect key, e.g. `mysql` or `oracle`.
    ///
    /// Picks the SQL dialect only. The bundled `MySqlClient` serves the MySQL
    /// kinds and refuses the others; other databases need their own client.
    pub kind: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfig {
    /// 환경 변수에서 설정을 읽어옵니다.
    ///
    /// 현재 디렉토리, 그 다음 상위 디렉토리의 `.env` 파일을 먼저 로드합니다.
    /// 환경 변수가 없으면 기본값을 사용합니다.
    pub fn from_env() -> Result<Self, DaoError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DaoError> {
        let kind = lookup("db_kind").unwrap_or_else(|| {
            warn!("db_kind 환경변수가 없어서 mysql을 사용합니다.");
            "mysql".to_string()
        });

        let host = lookup("db_host").unwrap_or_else(|| {
            warn!("db_host 환경변수가 없어서 localhost를 사용합니다.");
            "localhost".to_string()
        });

        let port_str = lookup("db_port").unwrap_or_else(|| {
            warn!("db_port 환경변수가 없어서 3306을 사용합니다.");
            "3306".to_string()
        });
        let port = port_str.trim().parse::<u16>().map_err(|_| {
            DaoError::Configuration(format!("db_port는 숫자여야 합니다: '{port_str}'"))
        })?;

        let user = lookup("db_id").unwrap_or_else(|| {
            warn!("db_id 환경변수가 없어서 root를 사용합니다.");
            "root".to_string()
        });

        let password = lookup("db_password").unwrap_or_else(|| {
            error!("db_password 환경변수가 필요합니다.");
            String::new()
        });

        let database = lookup("db_name").unwrap_or_else(|| {
            warn!("db_name 환경변수가 없어서 test를 사용합니다.");
            "test".to_string()
        });

        Ok(Self {
            kind,
            host,
            port,
            user,
            password,
            database,
        })
    }

    /// `mysql`, `mariadb` 또는 `mysql-strict` 인지 여부
    pub fn is_mysql(&self) -> bool {
        matches!(
            self.kind.trim().to_ascii_lowercase().as_str(),
            "mysql" | "mariadb" | "mysql-strict"
        )
    }

    /// MySQL 연결 URL
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    /// Picks the dialect configured by `db_kind`.
    pub fn dialect(&self, registry: &DialectRegistry) -> Result<Arc<dyn Dialect>, DaoError> {
        registry.resolve(&self.kind)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// .env 파일 로드 - 현재 디렉토리, 상위 디렉토리 순서
fn load_dotenv() {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let workspace_env = current_dir.join(".env");
    let parent_env = current_dir.parent().map(|p| p.join(".env"));

    if workspace_env.exists() {
        dotenv::from_path(&workspace_env).ok();
        info!("환경 파일 로드: {:?}", workspace_env);
    } else if let Some(parent_env) = parent_env.filter(|p| p.exists()) {
        dotenv::from_path(&parent_env).ok();
        info!("환경 파일 로드: {:?}", parent_env);
    } else {
        dotenv().ok();
        warn!(".env 파일을 찾을 수 없어서 환경 변수를 직접 사용합니다.");
    }
}
