//! Row cursors over completed executions.
//!
//! Three strategies turn a finished execution into rows, selected by
//! [`ResultMode`]: paging the result-set API, downloading the result CSV, or
//! downloading the compressed data files of a temporary CTAS table. All of
//! them implement [`RowCursor`].

mod api;
mod buffer;
pub mod convert;
pub mod decode;
mod download;
mod gzip;

pub use api::ApiRows;
pub use buffer::DownloadedRows;
pub use convert::{ColumnKind, NullEncoding, TypeVocabulary};
pub use download::DownloadRows;
pub use gzip::GzipRows;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{ColumnInfo, ObjectStore, OutputLocation, QueryEngine, Row};
use crate::error::{AthenaError, Result};
use crate::query::{CtasCleanup, Interrupt, QueryKind, ResultMode};

/// Cursor lifecycle.
///
/// `Uninitialized -> Initializing -> Ready -> Exhausted`, and `Closed` from
/// any state. Cursors are handed out only once `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Uninitialized,
    Initializing,
    Ready,
    Exhausted,
    Closed,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Sequential access to the rows of one execution.
///
/// One consumer drains one cursor; the mode is fixed for its lifetime.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names, in result order.
    fn columns(&self) -> Vec<String>;

    /// Declared type name of a column, in the cursor's [`TypeVocabulary`].
    fn column_type_name(&self, index: usize) -> Option<&str>;

    /// Which metadata source the type names come from.
    fn type_vocabulary(&self) -> TypeVocabulary;

    /// The mode this cursor was opened in.
    fn result_mode(&self) -> ResultMode;

    fn state(&self) -> CursorState;

    /// Returns the next row, or `None` once the rows are exhausted.
    /// Calling again after `None` keeps returning `None`.
    async fn next(&mut self) -> Result<Option<Row>>;

    /// Releases buffered rows. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Boxed cursor handed to callers.
pub type Rows = Box<dyn RowCursor>;

/// Drains a cursor into memory and closes it.
pub async fn collect_rows(cursor: &mut dyn RowCursor) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.next().await? {
        rows.push(row);
    }
    cursor.close()?;
    Ok(rows)
}

/// Inputs for opening a cursor on a finished execution.
#[derive(Debug)]
pub struct RowsConfig {
    pub execution_id: String,
    pub mode: ResultMode,
    pub kind: QueryKind,
    pub output_location: OutputLocation,
    pub database: String,
    pub catalog: Option<String>,

    /// Bound on the initial fetch of the download modes.
    pub timeout: Duration,
    pub interrupt: Interrupt,

    /// Temporary table holding the output, in compressed mode.
    pub ctas_table: Option<String>,

    /// Drops the temporary table once its rows are in memory.
    pub cleanup: Option<CtasCleanup>,
}

/// Opens the cursor for the configured mode.
///
/// This is the central factory for row cursors.
pub async fn open_rows(
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ObjectStore>,
    config: RowsConfig,
) -> Result<Rows> {
    match config.mode {
        ResultMode::Api => {
            let skip_header = config.kind == QueryKind::Ddl;
            let rows = ApiRows::open(engine, &config.execution_id, skip_header).await?;
            Ok(Box::new(rows))
        }
        ResultMode::Download => {
            let rows = DownloadRows::open(engine, store, &config).await?;
            Ok(Box::new(rows))
        }
        ResultMode::GzipDownload => {
            let rows = GzipRows::open(engine, store, config).await?;
            Ok(Box::new(rows))
        }
    }
}

/// Runs two fetches concurrently and waits for both.
///
/// The first error wins and the other fetch is dropped. The pair is bounded by
/// `timeout` and aborted when `interrupt` fires.
pub(crate) async fn join_within<A, B, FA, FB>(
    first: FA,
    second: FB,
    timeout: Duration,
    interrupt: &Interrupt,
) -> Result<(A, B)>
where
    FA: Future<Output = Result<A>>,
    FB: Future<Output = Result<B>>,
{
    tokio::select! {
        biased;
        reason = interrupt.fired() => Err(AthenaError::cancelled(reason)),
        joined = tokio::time::timeout(timeout, futures::future::try_join(first, second)) => {
            joined.map_err(|_| {
                AthenaError::cancelled(format!("result fetch timed out after {timeout:?}"))
            })?
        }
    }
}

/// Shared read-state checks. Returns false once exhausted.
fn ensure_readable(state: CursorState) -> Result<bool> {
    match state {
        CursorState::Ready => Ok(true),
        CursorState::Exhausted => Ok(false),
        CursorState::Closed => Err(AthenaError::internal("cursor is closed")),
        CursorState::Uninitialized | CursorState::Initializing => {
            Err(AthenaError::internal("cursor is not initialized"))
        }
    }
}

fn column_names(columns: &[ColumnInfo]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}

fn column_type(columns: &[ColumnInfo], index: usize) -> Option<&str> {
    columns.get(index).map(|c| c.data_type.as_str())
}
