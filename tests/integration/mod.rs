//! Integration tests for athena-cursor.
//!
//! Shared fixtures live here; scenarios are grouped by concern.

pub mod cursor_test;
pub mod lifecycle_test;

use std::sync::Arc;
use std::time::Duration;

use athena_cursor::engine::{MemoryObjectStore, MockQueryEngine};
use athena_cursor::{Connection, ConnectionConfig};

/// Output location every fixture connection writes to.
pub const OUTPUT_LOCATION: &str = "s3://athena-results/staging/";

/// A connection wired to fresh mocks.
pub struct Harness {
    pub engine: Arc<MockQueryEngine>,
    pub store: Arc<MemoryObjectStore>,
    pub conn: Connection,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(
            ConnectionConfig::new("sampledb").with_output_location(OUTPUT_LOCATION),
        )
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        let engine = Arc::new(MockQueryEngine::new());
        let store = Arc::new(MemoryObjectStore::new());
        let config = config.with_poll_frequency(Duration::from_millis(1));
        let conn = Connection::new(engine.clone(), store.clone(), config).unwrap();
        Self {
            engine,
            store,
            conn,
        }
    }

    /// Stores an object under the fixture output location's prefix.
    pub fn put(&self, key: &str, body: impl Into<Vec<u8>>) {
        self.store
            .put_object("athena-results", &format!("staging/{key}"), body);
    }
}
