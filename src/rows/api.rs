//! Result-set API cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::convert::{convert_cells, TypeVocabulary};
use super::{column_names, column_type, ensure_readable, CursorState, RowCursor};
use crate::engine::{ColumnInfo, QueryEngine, Row};
use crate::error::Result;
use crate::query::ResultMode;

/// Pages through the engine's result-set API, one page in memory at a time.
pub struct ApiRows {
    engine: Arc<dyn QueryEngine>,
    execution_id: String,
    columns: Vec<ColumnInfo>,
    page: VecDeque<Vec<Option<String>>>,
    next_token: Option<String>,
    state: CursorState,
}

impl ApiRows {
    /// Fetches the first page.
    ///
    /// With `skip_header`, the first row of the first page is an echoed header
    /// rather than data and is dropped.
    pub async fn open(
        engine: Arc<dyn QueryEngine>,
        execution_id: &str,
        skip_header: bool,
    ) -> Result<Self> {
        let mut rows = Self {
            engine,
            execution_id: execution_id.to_string(),
            columns: Vec::new(),
            page: VecDeque::new(),
            next_token: None,
            state: CursorState::Uninitialized,
        };
        rows.init(skip_header).await?;
        Ok(rows)
    }

    async fn init(&mut self, skip_header: bool) -> Result<()> {
        self.state = CursorState::Initializing;
        self.fetch_page().await?;
        if skip_header {
            self.page.pop_front();
        }
        self.state = CursorState::Ready;
        debug!(
            "Opened API cursor for {} with {} columns",
            self.execution_id,
            self.columns.len()
        );
        Ok(())
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let page = self
            .engine
            .result_page(&self.execution_id, self.next_token.as_deref())
            .await?;
        if self.columns.is_empty() {
            self.columns = page.columns;
        }
        self.page = page.rows.into();
        self.next_token = page.next_token;
        Ok(())
    }
}

#[async_trait]
impl RowCursor for ApiRows {
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
        ResultMode::Api
    }

    fn state(&self) -> CursorState {
        self.state
    }

    async fn next(&mut self) -> Result<Option<Row>> {
        if !ensure_readable(self.state)? {
            return Ok(None);
        }

        loop {
            if let Some(cells) = self.page.front() {
                let row = convert_cells(&self.columns, cells)?;
                self.page.pop_front();
                return Ok(Some(row));
            }
            if self.next_token.is_none() {
                self.state = CursorState::Exhausted;
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.state != CursorState::Closed {
            self.page = VecDeque::new();
            self.next_token = None;
            self.state = CursorState::Closed;
            debug!("Closed API cursor for {}", self.execution_id);
        }
        Ok(())
    }
}
