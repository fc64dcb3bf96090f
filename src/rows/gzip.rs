//! Compressed download cursor over a temporary CTAS table.
//!
//! Initialization runs two fetches concurrently: the table's data files (via
//! the manifest the CTAS execution writes) and the table's columns from the
//! catalog. Both must succeed before any row is served. The temporary table is
//! dropped once both have finished, whatever their outcome.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::buffer::DownloadedRows;
use super::convert::{convert_row, NullEncoding, TypeVocabulary};
use super::decode::{decode_data_file, parse_manifest, RawRows};
use super::{
    column_names, column_type, ensure_readable, join_within, CursorState, RowCursor, RowsConfig,
};
use crate::engine::{ColumnInfo, ObjectStore, OutputLocation, QueryEngine, Row, DEFAULT_CATALOG};
use crate::error::{AthenaError, Result};
use crate::query::ResultMode;

/// Serves rows decoded from a CTAS table's compressed text files.
///
/// Column types come from the data catalog, whose type names differ from the
/// result-set metadata (`string` rather than `varchar`, `int` rather than
/// `integer`).
pub struct GzipRows {
    execution_id: String,
    table: String,
    columns: Vec<ColumnInfo>,
    rows: DownloadedRows,
    state: CursorState,
}

impl GzipRows {
    /// Downloads the table's rows and columns, then runs the cleanup.
    ///
    /// A fetch error is returned after the cleanup has run; a cleanup failure is
    /// then only logged. After a successful fetch a cleanup failure is returned.
    pub async fn open(
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ObjectStore>,
        mut config: RowsConfig,
    ) -> Result<Self> {
        let table = config
            .ctas_table
            .clone()
            .ok_or_else(|| AthenaError::internal("compressed download requires a CTAS table"))?;
        let cleanup = config.cleanup.take();

        let mut rows = Self {
            execution_id: config.execution_id.clone(),
            table,
            columns: Vec::new(),
            rows: DownloadedRows::default(),
            state: CursorState::Uninitialized,
        };
        let fetched = rows.init(engine.as_ref(), store.as_ref(), &config).await;

        match (fetched, cleanup) {
            (Ok(()), Some(cleanup)) => {
                cleanup.run().await?;
            }
            (Err(e), Some(cleanup)) => {
                if let Err(cleanup_err) = cleanup.run().await {
                    warn!(
                        "Temporary table {} may have leaked: {}",
                        rows.table, cleanup_err
                    );
                }
                return Err(e);
            }
            (Err(e), None) => return Err(e),
            (Ok(()), None) => {}
        }

        rows.state = CursorState::Ready;
        Ok(rows)
    }

    async fn init(
        &mut self,
        engine: &dyn QueryEngine,
        store: &dyn ObjectStore,
        config: &RowsConfig,
    ) -> Result<()> {
        self.state = CursorState::Initializing;

        let catalog = config.catalog.as_deref().unwrap_or(DEFAULT_CATALOG);
        let (data, columns) = join_within(
            download_table_data(store, &config.output_location, &config.execution_id),
            fetch_table_columns(engine, catalog, &config.database, &self.table),
            config.timeout,
            &config.interrupt,
        )
        .await?;

        debug!(
            "Downloaded {} rows of {} for {}",
            data.len(),
            self.table,
            self.execution_id
        );
        self.rows = data;
        self.columns = columns;
        Ok(())
    }
}

/// Reads the manifest, then each listed data file in listing order.
async fn download_table_data(
    store: &dyn ObjectStore,
    location: &OutputLocation,
    execution_id: &str,
) -> Result<DownloadedRows> {
    let manifest = location.manifest_object(execution_id);
    let body = store
        .get_object(&manifest.bucket, &manifest.key)
        .await
        .map_err(|e| AthenaError::download(e.detail()))?;

    let entries = parse_manifest(&body)?;
    let mut batches: Vec<RawRows> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let object = location.manifest_entry(entry)?;
        let data = store
            .get_object(&object.bucket, &object.key)
            .await
            .map_err(|e| AthenaError::download(e.detail()))?;
        let records = decode_data_file(&data)
            .map_err(|e| AthenaError::download(format!("{object}: {}", e.detail())))?;
        batches.push(records);
    }

    Ok(DownloadedRows::from_batches(batches))
}

async fn fetch_table_columns(
    engine: &dyn QueryEngine,
    catalog: &str,
    database: &str,
    table: &str,
) -> Result<Vec<ColumnInfo>> {
    engine
        .table_columns(catalog, database, table)
        .await
        .map_err(|e| AthenaError::metadata(e.detail()))
}

#[async_trait]
impl RowCursor for GzipRows {
    fn columns(&self) -> Vec<String> {
        column_names(&self.columns)
    }

    fn column_type_name(&self, index: usize) -> Option<&str> {
        column_type(&self.columns, index)
    }

    fn type_vocabulary(&self) -> TypeVocabulary {
        TypeVocabulary::Catalog
    }

    fn result_mode(&self) -> ResultMode {
        ResultMode::GzipDownload
    }

    fn state(&self) -> CursorState {
        self.state
    }

    async fn next(&mut self) -> Result<Option<Row>> {
        if !ensure_readable(self.state)? {
            return Ok(None);
        }
        let Some(raw) = self.rows.current() else {
            self.state = CursorState::Exhausted;
            return Ok(None);
        };
        let row = convert_row(&self.columns, raw, NullEncoding::Marker)?;
        self.rows.advance();
        Ok(Some(row))
    }

    fn close(&mut self) -> Result<()> {
        if self.state != CursorState::Closed {
            self.rows.clear();
            self.state = CursorState::Closed;
            debug!("Closed compressed cursor for {}", self.execution_id);
        }
        Ok(())
    }
}
