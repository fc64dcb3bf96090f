//! Remote query engine and object store abstraction.
//!
//! Provides trait-based interfaces for the two remote collaborators, so the
//! lifecycle and cursor code can run against a real service or the in-memory
//! mocks interchangeably.

mod location;
pub mod mock;
mod types;

pub use location::{ObjectRef, OutputLocation};
pub use mock::{MemoryObjectStore, MockExecution, MockQueryEngine};
pub use types::{ColumnInfo, QueryState, QueryStatus, ResultPage, Row, StartQueryRequest, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Catalog consulted for table metadata when none is configured.
pub const DEFAULT_CATALOG: &str = "AwsDataCatalog";

/// Interface to the asynchronous query service.
///
/// Every call is a single network round trip. Implementations report failures
/// as `AthenaError::Remote` unless a more specific variant applies.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Starts an execution and returns its id.
    async fn start_query(&self, request: &StartQueryRequest) -> Result<String>;

    /// Returns the current status of an execution.
    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus>;

    /// Asks the engine to stop an execution.
    async fn stop_query(&self, execution_id: &str) -> Result<()>;

    /// Fetches one page of a completed execution's result set.
    async fn result_page(&self, execution_id: &str, next_token: Option<&str>)
        -> Result<ResultPage>;

    /// Fetches a table's columns from the data catalog.
    async fn table_columns(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>>;

    /// Returns the output location configured on a workgroup, if any.
    async fn workgroup_output_location(&self, workgroup: &str) -> Result<Option<String>>;
}

/// Interface to the object store holding result files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object in full.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}
