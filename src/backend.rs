use crate::core::{DbError, Result, Value};
use crate::datasource::DataSource;
use async_trait::async_trait;

/// Status code for a row that executed without a known affected-row count.
pub const SUCCESS_NO_INFO: i64 = -2;

/// Status code for a row a backend reports as failed inside an otherwise completed batch.
pub const EXECUTE_FAILED: i64 = -3;

/// The statement execution engine batches are sent to.
///
/// Every call returns one status code per row (usually the affected-row
/// count) or fails as a whole.
#[async_trait]
pub trait BatchBackend: Send + Sync {
    /// Executes one statement once per row against `source`.
    async fn batch_update(
        &self,
        source: &DataSource,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> Result<Vec<i64>>;

    /// Whether [`BatchBackend::batch_update_multi`] is implemented.
    fn supports_multi_statement(&self) -> bool {
        false
    }

    /// Executes `sqls[i]` with `rows[i]` for every `i`, as one batch against `source`.
    async fn batch_update_multi(
        &self,
        source: &DataSource,
        sqls: &[String],
        rows: &[Vec<Value>],
    ) -> Result<Vec<i64>> {
        let _ = (sqls, rows);
        Err(DbError::UnsupportedOperation(format!(
            "multi-statement batches are not supported for data source '{}'",
            source.name()
        )))
    }
}
