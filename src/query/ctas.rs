//! Temporary CTAS tables backing the compressed download mode.

use tracing::{info, warn};
use uuid::Uuid;

use super::{Interrupt, QueryExecutor, SubmitContext};
use crate::error::Result;

/// Name prefix of every temporary table.
pub const CTAS_TABLE_PREFIX: &str = "tmp_ctas_";

/// Storage options for the temporary table: gzip-compressed text files.
pub const CTAS_FORMAT_OPTIONS: &str = "format='TEXTFILE', write_compression='GZIP'";

/// A SELECT rewritten to materialize into a temporary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtasRewrite {
    pub table: String,
    pub query: String,
}

impl CtasRewrite {
    /// Builds the cleanup that drops this rewrite's table.
    pub fn cleanup(&self, executor: QueryExecutor, context: SubmitContext) -> CtasCleanup {
        CtasCleanup {
            executor,
            context,
            table: self.table.clone(),
        }
    }
}

/// Generates a unique temporary table name.
pub fn temp_table_name() -> String {
    format!("{CTAS_TABLE_PREFIX}{}", Uuid::new_v4().simple())
}

/// Rewrites a SELECT as `CREATE TABLE <tmp> WITH (...) AS <select>`.
pub fn wrap_as_ctas(sql: &str) -> CtasRewrite {
    let table = temp_table_name();
    let query = format!("CREATE TABLE {table} WITH ({CTAS_FORMAT_OPTIONS}) AS {sql}");
    CtasRewrite { table, query }
}

/// Drops a temporary table through the normal submit-and-wait pipeline.
///
/// Consumed by [`CtasCleanup::run`], so a table is dropped at most once.
pub struct CtasCleanup {
    executor: QueryExecutor,
    context: SubmitContext,
    table: String,
}

impl CtasCleanup {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Issues `DROP TABLE`. Not tied to the caller's cancellation.
    pub async fn run(self) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.table);
        match self.executor.run(&sql, &self.context, &Interrupt::never()).await {
            Ok(_) => {
                info!("Dropped temporary table {}", self.table);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to drop temporary table {}: {}", self.table, e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for CtasCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtasCleanup")
            .field("table", &self.table)
            .finish()
    }
}
