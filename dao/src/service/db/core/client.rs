//! Database client capability set
//!
//! The executor only needs these four primitives; connection management,
//! pooling and transactions stay with the implementation.

use crate::service::db::core::types::{ProcedureParam, Row, SqlValue};
use crate::tool::error::DaoError;
use async_trait::async_trait;

#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Runs a mutating statement and returns the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DaoError>;

    /// Runs `sql` once per parameter set, in order.
    async fn execute_batch(&self, sql: &str, batches: &[Vec<SqlValue>]) -> Result<Vec<u64>, DaoError>;

    /// Runs a query and returns every row.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DaoError>;

    /// Calls a stored procedure. The result has one entry per parameter:
    /// `None` for IN positions, the OUT value as text for OUT positions.
    async fn call(&self, sql: &str, params: &[ProcedureParam]) -> Result<Vec<Option<String>>, DaoError>;
}
