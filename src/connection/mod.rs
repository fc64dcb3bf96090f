//! Connection surface for issuing queries.
//!
//! Ties the query lifecycle together: classify, resolve options, optionally
//! rewrite into a temporary CTAS table, run, and open the row cursor.

mod client;

pub use client::Connection;
