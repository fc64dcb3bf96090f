//! Result modes and per-call option resolution.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{Interrupt, QueryKind};
use crate::config::ConnectionConfig;
use crate::error::{AthenaError, Result};

/// How a completed execution's output becomes a row cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResultMode {
    /// Page through the engine's result-set API.
    #[default]
    Api,
    /// Download the execution's CSV result file.
    Download,
    /// Rewrite as CTAS and download the table's compressed data files.
    GzipDownload,
}

impl ResultMode {
    /// Short name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Download => "dl",
            Self::GzipDownload => "gzip",
        }
    }

    /// Parses a numeric mode code (0 = API, 1 = download, 2 = compressed).
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Api),
            1 => Ok(Self::Download),
            2 => Ok(Self::GzipDownload),
            other => Err(AthenaError::config(format!("Invalid result mode: {other}"))),
        }
    }
}

impl fmt::Display for ResultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultMode {
    type Err = AthenaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "dl" | "download" => Ok(Self::Download),
            "gzip" | "gzip_dl" | "gzipdl" => Ok(Self::GzipDownload),
            other => match other.parse::<i64>() {
                Ok(code) => Self::from_code(code),
                Err(_) => Err(AthenaError::config(format!(
                    "Invalid result mode: {s}. Expected: api, dl, or gzip"
                ))),
            },
        }
    }
}

impl TryFrom<String> for ResultMode {
    type Error = AthenaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResultMode> for String {
    fn from(mode: ResultMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Per-call overrides of the connection defaults.
///
/// Precedence for each field: the value set here, then the connection config.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub result_mode: Option<ResultMode>,
    pub timeout: Option<Duration>,
    pub catalog: Option<String>,

    /// Cancels the call when triggered.
    pub cancel: CancellationToken,

    /// Upper bound on the whole call, measured from option resolution.
    pub deadline: Option<Duration>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result_mode(mut self, mode: ResultMode) -> Self {
        self.result_mode = Some(mode);
        self
    }

    /// Sets the result mode from its textual form.
    pub fn with_result_mode_str(self, mode: &str) -> Result<Self> {
        Ok(self.with_result_mode(mode.parse()?))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Effective settings for one call.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub kind: QueryKind,
    pub mode: ResultMode,
    pub timeout: Duration,
    pub catalog: Option<String>,
    pub interrupt: Interrupt,
}

impl ResolvedQuery {
    /// Whether the query is rewritten into a temporary CTAS table.
    pub fn uses_ctas(&self) -> bool {
        self.kind.is_select() && self.mode == ResultMode::GzipDownload
    }
}

/// Merges connection defaults with per-call overrides.
///
/// Anything but a SELECT is forced to API mode, since the download modes
/// assume a tabular result file.
pub fn resolve(
    config: &ConnectionConfig,
    options: &QueryOptions,
    kind: QueryKind,
) -> Result<ResolvedQuery> {
    let requested = options.result_mode.unwrap_or(config.result_mode);
    let mode = if kind.is_select() {
        requested
    } else {
        ResultMode::Api
    };

    let timeout = options.timeout.unwrap_or_else(|| config.timeout());
    if timeout.is_zero() {
        return Err(AthenaError::config("timeout must be greater than zero"));
    }

    let catalog = options
        .catalog
        .clone()
        .or_else(|| config.catalog.clone())
        .filter(|c| !c.trim().is_empty());

    Ok(ResolvedQuery {
        kind,
        mode,
        timeout,
        catalog,
        interrupt: Interrupt::new(options.cancel.clone(), options.deadline),
    })
}
