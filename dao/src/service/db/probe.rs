//! 데이터베이스 연결 확인

use crate::service::db::core::executor::QueryExecutor;
use crate::tool::error::DaoError;
use tracing::{error, info};

/// Runs the dialect's probe query and reports the outcome.
pub struct ConnectionProbe {
    executor: QueryExecutor,
}

impl ConnectionProbe {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// 프로브 쿼리 결과 문자열을 반환합니다. 실패하면 에러를 그대로 돌려줍니다.
    pub async fn run(&self) -> Result<String, DaoError> {
        let dialect = self.executor.dialect();
        info!("[{}] 데이터베이스 연결 확인 시작", dialect.name());

        match self
            .executor
            .query_object::<String>(dialect.probe_query(), &[])
            .await
        {
            Ok(answer) => {
                info!("[{}] 연결 확인 성공: {}", dialect.name(), answer);
                Ok(answer)
            }
            Err(e) => {
                error!("[{}] 연결 확인 실패: {}", dialect.name(), e);
                Err(e)
            }
        }
    }
}
