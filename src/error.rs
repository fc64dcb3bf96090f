//! Error types for athena-cursor.
//!
//! Defines the error enum shared by the query lifecycle and the result cursors.

use thiserror::Error;

/// Main error type for query and cursor operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AthenaError {
    /// Invalid configuration (unknown result mode, bad output location, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine rejected the query text or its execution context.
    #[error("Submission error: {0}")]
    Submission(String),

    /// The engine reported the execution as failed. Carries the engine's reason.
    #[error("Query failed: {0}")]
    ExecutionFailed(String),

    /// The execution was cancelled remotely, or the caller cancelled or timed out.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Object store fetch, decompression, or record parsing failed.
    #[error("Download error: {0}")]
    Download(String),

    /// Column metadata could not be fetched.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// A raw field could not be converted to its declared column type.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Any other failure reported by the remote engine.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Operation the engine cannot perform (transactions, bound parameters).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal errors (unexpected states, misuse of a closed cursor, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AthenaError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a submission error with the given message.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates an execution failure with the engine's reason.
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed(reason.into())
    }

    /// Creates a cancellation error with the given message.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a download error with the given message.
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    /// Creates a metadata error with the given message.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Creates a conversion error with the given message.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Creates a remote engine error with the given message.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Creates an unsupported-operation error with the given message.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Submission(_) => "Submission Error",
            Self::ExecutionFailed(_) => "Execution Failed",
            Self::Cancelled(_) => "Cancelled",
            Self::Download(_) => "Download Error",
            Self::Metadata(_) => "Metadata Error",
            Self::Conversion(_) => "Conversion Error",
            Self::Remote(_) => "Remote Error",
            Self::Unsupported(_) => "Unsupported Operation",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the message without the category prefix.
    ///
    /// Used when re-wrapping a remote error under a more specific variant so the
    /// remote text is carried verbatim.
    pub fn detail(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Submission(m)
            | Self::ExecutionFailed(m)
            | Self::Cancelled(m)
            | Self::Download(m)
            | Self::Metadata(m)
            | Self::Conversion(m)
            | Self::Remote(m)
            | Self::Unsupported(m)
            | Self::Internal(m) => m,
        }
    }

    /// Returns true for caller- or engine-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl From<std::io::Error> for AthenaError {
    fn from(err: std::io::Error) -> Self {
        Self::Download(err.to_string())
    }
}

/// Result type alias using AthenaError.
pub type Result<T> = std::result::Result<T, AthenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = AthenaError::config("invalid result mode: 7");
        assert_eq!(err.to_string(), "Configuration error: invalid result mode: 7");
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_execution_failed() {
        let err = AthenaError::execution_failed("SYNTAX_ERROR: line 1:8: Column 'x' cannot be resolved");
        assert_eq!(
            err.to_string(),
            "Query failed: SYNTAX_ERROR: line 1:8: Column 'x' cannot be resolved"
        );
        assert_eq!(err.category(), "Execution Failed");
    }

    #[test]
    fn test_error_detail_strips_prefix() {
        let err = AthenaError::remote("InvalidRequestException: bad database");
        assert_eq!(err.detail(), "InvalidRequestException: bad database");

        let resubmitted = AthenaError::submission(err.detail());
        assert_eq!(
            resubmitted.to_string(),
            "Submission error: InvalidRequestException: bad database"
        );
    }

    #[test]
    fn test_error_is_cancelled() {
        assert!(AthenaError::cancelled("deadline exceeded").is_cancelled());
        assert!(!AthenaError::download("no such key").is_cancelled());
    }

    #[test]
    fn test_io_error_maps_to_download() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt deflate stream");
        let err: AthenaError = io.into();
        assert_eq!(err.category(), "Download Error");
        assert_eq!(err.detail(), "corrupt deflate stream");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AthenaError>();
    }
}
