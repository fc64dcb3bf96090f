//! athena-cursor - query execution and row cursors for an asynchronous,
//! object-store-backed SQL engine.
//!
//! Statements are submitted, polled to completion, and exposed through a
//! [`rows::RowCursor`] backed by one of three result strategies. The remote
//! engine and object store sit behind the traits in [`engine`].

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod logging;
pub mod query;
pub mod rows;

pub use config::{Config, ConnectionConfig};
pub use connection::Connection;
pub use error::{AthenaError, Result};
pub use query::{QueryOptions, ResultMode};
pub use rows::{RowCursor, Rows};
