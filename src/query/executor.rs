//! Query submission and completion polling.
//!
//! Provides isolated execution that can be tested against the mock engine
//! independently of result handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{QueryEngine, QueryState, StartQueryRequest};
use crate::error::{AthenaError, Result};

/// Bound on the best-effort stop request sent after an interrupted wait.
pub const STOP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Caller-side cancellation: a token plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Interrupt {
    /// Creates an interrupt firing on `token` or once `within` has elapsed.
    pub fn new(token: CancellationToken, within: Option<Duration>) -> Self {
        Self {
            token,
            deadline: within.map(|d| Instant::now() + d),
        }
    }

    /// An interrupt that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Returns the reason if the interrupt has already fired.
    pub fn check(&self) -> Option<&'static str> {
        if self.token.is_cancelled() {
            return Some("query cancelled by caller");
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some("deadline exceeded"),
            _ => None,
        }
    }

    /// Resolves with the reason once the interrupt fires.
    pub async fn fired(&self) -> &'static str {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => "query cancelled by caller",
                    _ = tokio::time::sleep_until(deadline) => "deadline exceeded",
                }
            }
            None => {
                self.token.cancelled().await;
                "query cancelled by caller"
            }
        }
    }
}

/// Where and how a statement is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitContext {
    pub database: String,
    pub catalog: Option<String>,
    pub output_location: String,
    pub workgroup: String,
}

impl SubmitContext {
    fn request(&self, sql: &str) -> StartQueryRequest {
        StartQueryRequest {
            query: sql.to_string(),
            database: self.database.clone(),
            catalog: self.catalog.clone(),
            output_location: self.output_location.clone(),
            workgroup: self.workgroup.clone(),
        }
    }
}

/// Submits statements and waits for them to reach a terminal state.
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    poll_frequency: Duration,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(engine: Arc<dyn QueryEngine>, poll_frequency: Duration) -> Self {
        Self {
            engine,
            poll_frequency,
        }
    }

    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    /// Starts an execution. A rejection carries the engine's message verbatim.
    pub async fn submit(&self, sql: &str, context: &SubmitContext) -> Result<String> {
        let execution_id = self
            .engine
            .start_query(&context.request(sql))
            .await
            .map_err(|e| AthenaError::submission(e.detail()))?;
        debug!("Submitted execution {}", execution_id);
        Ok(execution_id)
    }

    /// Polls until the execution reaches a terminal state or `interrupt` fires.
    ///
    /// One status check is outstanding at a time and the full poll interval
    /// passes between checks. The interrupt also aborts an in-flight status
    /// check. When the interrupt fires, a single best-effort
    /// stop request is sent before the cancellation error is returned.
    pub async fn await_completion(&self, execution_id: &str, interrupt: &Interrupt) -> Result<()> {
        loop {
            if let Some(reason) = interrupt.check() {
                return Err(self.abandon(execution_id, reason).await);
            }

            let status = tokio::select! {
                biased;
                reason = interrupt.fired() => {
                    return Err(self.abandon(execution_id, reason).await);
                }
                status = self.engine.query_status(execution_id) => status?,
            };
            match status.state {
                QueryState::Succeeded => {
                    debug!("Execution {} succeeded", execution_id);
                    return Ok(());
                }
                QueryState::Failed => {
                    let reason = status
                        .state_change_reason
                        .unwrap_or_else(|| "query failed without a reason".to_string());
                    info!("Execution {} failed: {}", execution_id, reason);
                    return Err(AthenaError::execution_failed(reason));
                }
                QueryState::Cancelled => {
                    info!("Execution {} was cancelled", execution_id);
                    return Err(AthenaError::cancelled(format!(
                        "execution {execution_id} was cancelled"
                    )));
                }
                QueryState::Queued | QueryState::Running => {}
            }

            tokio::select! {
                biased;
                reason = interrupt.fired() => {
                    return Err(self.abandon(execution_id, reason).await);
                }
                _ = tokio::time::sleep(self.poll_frequency) => {}
            }
        }
    }

    /// Submits a statement and waits for it to finish, returning its id.
    pub async fn run(
        &self,
        sql: &str,
        context: &SubmitContext,
        interrupt: &Interrupt,
    ) -> Result<String> {
        let execution_id = self.submit(sql, context).await?;
        self.await_completion(&execution_id, interrupt).await?;
        Ok(execution_id)
    }

    /// Sends the stop request and builds the caller's cancellation error.
    /// The stop request's own outcome is only logged.
    async fn abandon(&self, execution_id: &str, reason: &str) -> AthenaError {
        info!("Stopping execution {}: {}", execution_id, reason);
        match tokio::time::timeout(STOP_REQUEST_TIMEOUT, self.engine.stop_query(execution_id)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Stop request for {} failed: {}", execution_id, e),
            Err(_) => warn!(
                "Stop request for {} timed out after {:?}",
                execution_id, STOP_REQUEST_TIMEOUT
            ),
        }
        AthenaError::cancelled(format!("{reason} while waiting for {execution_id}"))
    }
}
