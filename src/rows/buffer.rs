//! In-memory buffer for downloaded rows.

use super::decode::RawRows;

/// Rows downloaded once, then drained front to back by a single reader.
#[derive(Debug, Default)]
pub struct DownloadedRows {
    data: RawRows,
    cursor: usize,
}

impl DownloadedRows {
    pub fn new(data: RawRows) -> Self {
        Self { data, cursor: 0 }
    }

    /// Concatenates batches in the given order.
    pub fn from_batches(batches: impl IntoIterator<Item = RawRows>) -> Self {
        Self::new(batches.into_iter().flatten().collect())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The row under the cursor, if any.
    pub fn current(&self) -> Option<&[String]> {
        self.data.get(self.cursor).map(Vec::as_slice)
    }

    /// Moves past the current row.
    pub fn advance(&mut self) {
        if self.cursor < self.data.len() {
            self.cursor += 1;
        }
    }

    /// Releases the buffered rows.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.cursor = 0;
    }
}
