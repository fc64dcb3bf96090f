//! Direct download cursor: reads the execution's CSV result file.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::buffer::DownloadedRows;
use super::convert::{convert_row, NullEncoding, TypeVocabulary};
use super::decode::{parse_csv_records, RawRows};
use super::{
    column_names, column_type, ensure_readable, join_within, CursorState, RowCursor, RowsConfig,
};
use crate::engine::{ColumnInfo, ObjectRef, ObjectStore, QueryEngine, Row};
use crate::error::{AthenaError, Result};
use crate::query::ResultMode;

/// Serves rows from the execution's result CSV, downloaded in full.
///
/// Column types come from the result-set metadata.
pub struct DownloadRows {
    execution_id: String,
    columns: Vec<ColumnInfo>,
    rows: DownloadedRows,
    state: CursorState,
}

impl DownloadRows {
    /// Downloads the result file and its metadata concurrently.
    pub async fn open(
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ObjectStore>,
        config: &RowsConfig,
    ) -> Result<Self> {
        let mut rows = Self {
            execution_id: config.execution_id.clone(),
            columns: Vec::new(),
            rows: DownloadedRows::default(),
            state: CursorState::Uninitialized,
        };
        rows.init(engine.as_ref(), store.as_ref(), config).await?;
        Ok(rows)
    }

    async fn init(
        &mut self,
        engine: &dyn QueryEngine,
        store: &dyn ObjectStore,
        config: &RowsConfig,
    ) -> Result<()> {
        self.state = CursorState::Initializing;

        let object = config.output_location.result_object(&config.execution_id);
        let (data, columns) = join_within(
            download_result_file(store, object),
            fetch_result_columns(engine, &config.execution_id),
            config.timeout,
            &config.interrupt,
        )
        .await?;

        debug!(
            "Downloaded {} rows for {} with {} columns",
            data.len(),
            self.execution_id,
            columns.len()
        );
        self.rows = DownloadedRows::new(data);
        self.columns = columns;
        self.state = CursorState::Ready;
        Ok(())
    }
}

async fn download_result_file(store: &dyn ObjectStore, object: ObjectRef) -> Result<RawRows> {
    let body = store
        .get_object(&object.bucket, &object.key)
        .await
        .map_err(|e| AthenaError::download(e.detail()))?;
    parse_csv_records(body.as_slice())
}

async fn fetch_result_columns(engine: &dyn QueryEngine, execution_id: &str) -> Result<Vec<ColumnInfo>> {
    engine
        .result_page(execution_id, None)
        .await
        .map(|page| page.columns)
        .map_err(|e| AthenaError::metadata(e.detail()))
}

#[async_trait]
impl RowCursor for DownloadRows {
    fn columns(&self) -> Vec<String> {
        column_names(&self.columns)
    }

    fn column_type_name(&self, index: usize) -> Option<&str> {
        column_type(&self.columns, index)
    }

    fn type_vocabulary(&self) -> TypeVocabulary {
        TypeVocabulary::ResultSet
    }

    fn result_mode(&self) -> ResultMode {
        ResultMode::Download
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
        let row = convert_row(&self.columns, raw, NullEncoding::EmptyField)?;
        self.rows.advance();
        Ok(Some(row))
    }

    fn close(&mut self) -> Result<()> {
        if self.state != CursorState::Closed {
            self.rows.clear();
            self.state = CursorState::Closed;
            debug!("Closed download cursor for {}", self.execution_id);
        }
        Ok(())
    }
}
