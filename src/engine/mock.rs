//! Mock engine and object store for testing.
//!
//! Provides in-memory implementations with scripted execution states, so the
//! query lifecycle can be exercised without network access.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    ColumnInfo, ObjectRef, ObjectStore, QueryEngine, QueryState, QueryStatus, ResultPage,
    StartQueryRequest,
};
use crate::error::{AthenaError, Result};

/// Scripted behaviour for one submission, consumed in submission order.
#[derive(Debug, Clone)]
pub struct MockExecution {
    /// Statuses returned by successive polls. The last one repeats.
    pub statuses: Vec<QueryStatus>,

    /// Result-set pages served for the execution.
    pub pages: Vec<ResultPage>,

    /// When set, submission fails with this message.
    pub reject: Option<String>,
}

impl MockExecution {
    /// An execution that succeeds on the first poll.
    pub fn succeeded() -> Self {
        Self::with_states([QueryState::Succeeded])
    }

    /// An execution that moves through the given states.
    pub fn with_states(states: impl IntoIterator<Item = QueryState>) -> Self {
        Self {
            statuses: states.into_iter().map(QueryStatus::from).collect(),
            pages: Vec::new(),
            reject: None,
        }
    }

    /// An execution that fails on the first poll.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            statuses: vec![QueryStatus::failed(reason)],
            pages: Vec::new(),
            reject: None,
        }
    }

    /// A submission the engine refuses.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            statuses: Vec::new(),
            pages: Vec::new(),
            reject: Some(message.into()),
        }
    }

    /// Attaches result pages.
    pub fn with_pages(mut self, pages: Vec<ResultPage>) -> Self {
        self.pages = pages;
        self
    }
}

impl Default for MockExecution {
    fn default() -> Self {
        Self::succeeded()
    }
}

#[derive(Debug)]
struct ExecutionRecord {
    statuses: VecDeque<QueryStatus>,
    last: QueryStatus,
    pages: Vec<ResultPage>,
    polls: usize,
}

#[derive(Debug, Default)]
struct EngineState {
    next_id: usize,
    scripted: VecDeque<MockExecution>,
    executions: HashMap<String, ExecutionRecord>,
    submissions: Vec<StartQueryRequest>,
    stops: Vec<String>,
    stop_error: Option<String>,
    tables: HashMap<String, Vec<ColumnInfo>>,
    table_error: Option<String>,
    table_delay: Option<Duration>,
    status_delay: Option<Duration>,
    ctas_columns: Option<Vec<ColumnInfo>>,
    table_lookups: Vec<(String, String, String)>,
    workgroup_locations: HashMap<String, String>,
}

impl EngineState {
    fn track_tables(&mut self, query: &str) {
        let words: Vec<&str> = query.split_whitespace().take(3).collect();
        let [verb, noun, table] = words.as_slice() else {
            return;
        };
        if !noun.eq_ignore_ascii_case("TABLE") {
            return;
        }
        if verb.eq_ignore_ascii_case("CREATE") {
            if let Some(columns) = self.ctas_columns.clone() {
                self.tables.insert(table.to_string(), columns);
            }
        } else if verb.eq_ignore_ascii_case("DROP") {
            self.tables.remove(*table);
        }
    }
}

/// A mock engine that replays scripted executions.
#[derive(Debug, Default)]
pub struct MockQueryEngine {
    state: Mutex<EngineState>,
}

impl MockQueryEngine {
    /// Creates a mock engine where every execution succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the engine assigns to the `n`-th submission (1-based).
    pub fn execution_id(n: usize) -> String {
        format!("exec-{n}")
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues behaviour for the next unscripted submission.
    pub fn push_execution(&self, execution: MockExecution) {
        self.state().scripted.push_back(execution);
    }

    /// Registers a catalog table.
    pub fn add_table(&self, table: impl Into<String>, columns: Vec<ColumnInfo>) {
        self.state().tables.insert(table.into(), columns);
    }

    /// Registers the table of every succeeding `CREATE TABLE` with these
    /// columns, and forgets it again on a succeeding `DROP TABLE`.
    pub fn create_tables_with(&self, columns: Vec<ColumnInfo>) {
        self.state().ctas_columns = Some(columns);
    }

    /// Whether a catalog table is currently registered.
    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains_key(table)
    }

    /// Makes every catalog lookup fail with the given message.
    pub fn fail_table_lookups(&self, message: impl Into<String>) {
        self.state().table_error = Some(message.into());
    }

    /// Delays every catalog lookup.
    pub fn delay_table_lookups(&self, delay: Duration) {
        self.state().table_delay = Some(delay);
    }

    /// Delays every status check.
    pub fn delay_status_checks(&self, delay: Duration) {
        self.state().status_delay = Some(delay);
    }

    /// Makes every stop request fail with the given message.
    pub fn fail_stop_requests(&self, message: impl Into<String>) {
        self.state().stop_error = Some(message.into());
    }

    /// Sets the output location a workgroup reports.
    pub fn set_workgroup_location(&self, workgroup: impl Into<String>, location: impl Into<String>) {
        self.state()
            .workgroup_locations
            .insert(workgroup.into(), location.into());
    }

    /// All accepted and rejected submissions, in order.
    pub fn submissions(&self) -> Vec<StartQueryRequest> {
        self.state().submissions.clone()
    }

    /// Query texts of all submissions, in order.
    pub fn submitted_queries(&self) -> Vec<String> {
        self.state()
            .submissions
            .iter()
            .map(|s| s.query.clone())
            .collect()
    }

    /// Execution ids that received a stop request.
    pub fn stop_requests(&self) -> Vec<String> {
        self.state().stops.clone()
    }

    /// Number of status polls an execution received.
    pub fn poll_count(&self, execution_id: &str) -> usize {
        self.state()
            .executions
            .get(execution_id)
            .map_or(0, |e| e.polls)
    }

    /// `(catalog, database, table)` of every catalog lookup.
    pub fn table_lookups(&self) -> Vec<(String, String, String)> {
        self.state().table_lookups.clone()
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn start_query(&self, request: &StartQueryRequest) -> Result<String> {
        let mut state = self.state();
        state.submissions.push(request.clone());

        let script = state.scripted.pop_front().unwrap_or_default();
        if let Some(message) = script.reject {
            return Err(AthenaError::remote(message));
        }

        state.next_id += 1;
        let id = Self::execution_id(state.next_id);
        let last = script
            .statuses
            .last()
            .cloned()
            .unwrap_or_else(|| QueryStatus::new(QueryState::Succeeded));
        if last.state == QueryState::Succeeded {
            state.track_tables(&request.query);
        }
        state.executions.insert(
            id.clone(),
            ExecutionRecord {
                statuses: script.statuses.into(),
                last,
                pages: script.pages,
                polls: 0,
            },
        );
        Ok(id)
    }

    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus> {
        let delay = self.state().status_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let record = state.executions.get_mut(execution_id).ok_or_else(|| {
            AthenaError::remote(format!("InvalidRequestException: unknown execution {execution_id}"))
        })?;
        record.polls += 1;
        Ok(record
            .statuses
            .pop_front()
            .unwrap_or_else(|| record.last.clone()))
    }

    async fn stop_query(&self, execution_id: &str) -> Result<()> {
        let mut state = self.state();
        state.stops.push(execution_id.to_string());
        match &state.stop_error {
            Some(message) => Err(AthenaError::remote(message.clone())),
            None => Ok(()),
        }
    }

    async fn result_page(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let state = self.state();
        let record = state.executions.get(execution_id).ok_or_else(|| {
            AthenaError::remote(format!("InvalidRequestException: unknown execution {execution_id}"))
        })?;

        let index = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| AthenaError::remote(format!("invalid page token '{token}'")))?,
            None => 0,
        };

        if record.pages.is_empty() && index == 0 {
            return Ok(ResultPage::default());
        }

        let mut page = record
            .pages
            .get(index)
            .cloned()
            .ok_or_else(|| AthenaError::remote(format!("invalid page token '{index}'")))?;
        page.next_token = (index + 1 < record.pages.len()).then(|| (index + 1).to_string());
        Ok(page)
    }

    async fn table_columns(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnInfo>> {
        let delay = {
            let mut state = self.state();
            state
                .table_lookups
                .push((catalog.to_string(), database.to_string(), table.to_string()));
            state.table_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if let Some(message) = &state.table_error {
            return Err(AthenaError::remote(message.clone()));
        }
        state.tables.get(table).cloned().ok_or_else(|| {
            AthenaError::remote(format!("MetadataException: table {database}.{table} not found"))
        })
    }

    async fn workgroup_output_location(&self, workgroup: &str) -> Result<Option<String>> {
        Ok(self.state().workgroup_locations.get(workgroup).cloned())
    }
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<(String, String), Vec<u8>>,
    failing: HashSet<String>,
    fetches: Vec<ObjectRef>,
    delay: Option<Duration>,
}

/// An in-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<StoreState>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores an object.
    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.state()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// Makes reads of the given key fail.
    pub fn fail_key(&self, key: &str) {
        self.state().failing.insert(key.to_string());
    }

    /// Delays every read.
    pub fn delay_reads(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// Objects read so far, in order.
    pub fn fetches(&self) -> Vec<ObjectRef> {
        self.state().fetches.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.fetches.push(ObjectRef {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if state.failing.contains(key) {
            return Err(AthenaError::download(format!(
                "InternalError: read of s3://{bucket}/{key} failed"
            )));
        }
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| AthenaError::download(format!("NoSuchKey: s3://{bucket}/{key}")))
    }
}
