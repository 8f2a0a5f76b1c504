//! 쿼리 실행 모듈
//!
//! SQL 실행, 단일 행 계약, 결과 변환, 페이지 처리를 담당

use crate::service::db::core::client::DatabaseClient;
use crate::service::db::core::config::QueryConfig;
use crate::service::db::core::dialect::Dialect;
use crate::service::db::core::page::Page;
use crate::service::db::core::shape::{FromRow, ResultShaper, Shape, Shaped};
use crate::service::db::core::types::{ProcedureParam, Row, SqlValue};
use crate::tool::error::DaoError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 데이터베이스 작업을 위한 쿼리 실행기
///
/// Holds no per-call state; clones share the same client and dialect.
#[derive(Clone)]
pub struct QueryExecutor {
    /// 데이터베이스 클라이언트
    client: Arc<dyn DatabaseClient>,

    /// 페이지 쿼리 방언
    dialect: Arc<dyn Dialect>,

    /// 쿼리 설정
    config: QueryConfig,
}

impl QueryExecutor {
    /// 새 쿼리 실행기 생성
    pub fn new(client: Arc<dyn DatabaseClient>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            client,
            dialect,
            config: QueryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn client(&self) -> &Arc<dyn DatabaseClient> {
        &self.client
    }

    /// Execute INSERT/UPDATE/DELETE query
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DaoError> {
        self.log_query(sql, params);

        let start = Instant::now();
        let affected = self.client.execute(sql, params).await?;
        self.check_slow_query(sql, start);

        debug!("{} rows affected", affected);
        Ok(affected)
    }

    /// 같은 SQL을 파라미터 묶음마다 순서대로 실행
    pub async fn batch_execute(
        &self,
        sql: &str,
        batches: &[Vec<SqlValue>],
    ) -> Result<Vec<u64>, DaoError> {
        if batches.is_empty() {
            return Ok(Vec::new());
        }

        if self.config.enable_query_logging {
            debug!("Executing batch ({} sets): {}", batches.len(), sql);
        }

        let start = Instant::now();
        let counts = self.client.execute_batch(sql, batches).await?;
        self.check_slow_query(sql, start);

        if counts.len() != batches.len() {
            return Err(DaoError::DatabaseQuery(format!(
                "batch returned {} counts for {} parameter sets",
                counts.len(),
                batches.len()
            )));
        }

        Ok(counts)
    }

    /// Calls a stored procedure.
    ///
    /// The result is positional: `None` for IN parameters, the OUT value as
    /// text (or `None` for SQL NULL) for OUT parameters.
    pub async fn call_procedure(
        &self,
        sql: &str,
        params: &[ProcedureParam],
    ) -> Result<Vec<Option<String>>, DaoError> {
        if self.config.enable_query_logging {
            let outs = params.iter().filter(|p| p.is_out()).count();
            debug!(
                "Calling procedure: {} | Params: {:?} ({} OUT)",
                sql, params, outs
            );
        }

        let start = Instant::now();
        let results = self.client.call(sql, params).await?;
        self.check_slow_query(sql, start);

        if results.len() != params.len() {
            return Err(DaoError::DatabaseQuery(format!(
                "procedure returned {} values for {} parameters",
                results.len(),
                params.len()
            )));
        }

        Ok(results)
    }

    /// 정확히 한 행을 조회
    pub async fn query_object<T: FromRow>(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<T, DaoError> {
        self.query_object_or_null(sql, params)
            .await?
            .ok_or(DaoError::EmptyResult)
    }

    /// 0행이면 `None`, 2행 이상이면 여전히 에러
    pub async fn query_object_or_null<T: FromRow>(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<T>, DaoError> {
        self.fetch_single(sql, params, &T::shape())
            .await?
            .map(T::from_shaped)
            .transpose()
    }

    pub async fn query_map(&self, sql: &str, params: &[SqlValue]) -> Result<Row, DaoError> {
        self.query_object::<Row>(sql, params).await
    }

    pub async fn query_map_or_null(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<Row>, DaoError> {
        self.query_object_or_null::<Row>(sql, params).await
    }

    pub async fn query_list<T: FromRow>(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<T>, DaoError> {
        self.query_shaped(sql, params, &T::shape())
            .await?
            .into_iter()
            .map(T::from_shaped)
            .collect()
    }

    /// `max_results` rows starting after row `first_result`.
    pub async fn query_list_window<T: FromRow>(
        &self,
        sql: &str,
        params: &[SqlValue],
        first_result: u64,
        max_results: u64,
    ) -> Result<Vec<T>, DaoError> {
        let end = first_result.saturating_add(max_results);
        let paged_sql = self.dialect.page_query(sql, first_result, end);
        self.query_list(&paged_sql, params).await
    }

    /// 전체 건수와 요청한 페이지의 행을 함께 조회
    ///
    /// Either sub-query failing surfaces as [`DaoError::PageQuery`].
    pub async fn query_page<T: FromRow>(
        &self,
        sql: &str,
        params: &[SqlValue],
        page_number: i64,
        page_size: i64,
    ) -> Result<Page<T>, DaoError> {
        self.build_page(sql, params, page_number, page_size)
            .await
            .map_err(|e| {
                warn!("Page query failed (page {}, size {}): {}", page_number, page_size, e);
                DaoError::page_query(e)
            })
    }

    async fn build_page<T: FromRow>(
        &self,
        sql: &str,
        params: &[SqlValue],
        page_number: i64,
        page_size: i64,
    ) -> Result<Page<T>, DaoError> {
        if page_size <= 0 {
            return Err(DaoError::InvalidInput(format!(
                "page size must be positive, got {page_size}"
            )));
        }

        let count_sql = self.dialect.count_query(sql);
        let total_count = self.query_object::<i64>(&count_sql, params).await?;

        let first_result = page_number
            .saturating_sub(1)
            .saturating_mul(page_size)
            .max(0) as u64;
        let list = self
            .query_list_window(sql, params, first_result, page_size as u64)
            .await?;

        Ok(Page::new(list, page_number, page_size, total_count))
    }

    /// 호출자가 지정한 형태로 모든 행을 변환
    pub async fn query_shaped(
        &self,
        sql: &str,
        params: &[SqlValue],
        shape: &Shape,
    ) -> Result<Vec<Shaped>, DaoError> {
        let rows = self.fetch_rows(sql, params).await?;
        ResultShaper::shape_rows(shape, rows).map_err(|e| {
            debug!("Rows could not be shaped as {}: {}", shape.describe(), e);
            e
        })
    }

    pub async fn query_one_shaped(
        &self,
        sql: &str,
        params: &[SqlValue],
        shape: &Shape,
    ) -> Result<Option<Shaped>, DaoError> {
        self.fetch_single(sql, params, shape).await
    }

    /// Single-row contract shared by every `query_object*` / `query_map*`
    /// call: zero rows is `None`, more than one is `MultipleResults`.
    async fn fetch_single(
        &self,
        sql: &str,
        params: &[SqlValue],
        shape: &Shape,
    ) -> Result<Option<Shaped>, DaoError> {
        let mut rows = self.fetch_rows(sql, params).await?;

        match rows.len() {
            0 => Ok(None),
            1 => {
                let row = rows.remove(0);
                ResultShaper::shape_row(shape, row).map(Some)
            }
            actual => Err(DaoError::MultipleResults { actual }),
        }
    }

    async fn fetch_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DaoError> {
        self.log_query(sql, params);

        let start = Instant::now();
        let rows = self.client.query(sql, params).await?;
        let elapsed = start.elapsed();
        self.check_slow_query(sql, start);

        debug!("Query returned {} rows in {:?}", rows.len(), elapsed);
        Ok(rows)
    }

    /// Log query if enabled
    fn log_query(&self, sql: &str, params: &[SqlValue]) {
        if self.config.enable_query_logging {
            if params.is_empty() {
                debug!("Executing query: {}", sql);
            } else {
                debug!("Executing query: {} | Params: {:?}", sql, params);
            }
        }
    }

    /// Check for slow queries
    fn check_slow_query(&self, sql: &str, start: Instant) {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > self.config.slow_query_threshold_ms {
            warn!(
                "Slow query detected ({} ms): {}",
                elapsed_ms,
                sql.chars().take(200).collect::<String>()
            );
        }
    }
}
