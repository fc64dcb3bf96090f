//! Connection: the entry point for running statements.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::engine::{ObjectStore, OutputLocation, QueryEngine, Value};
use crate::error::{AthenaError, Result};
use crate::query::{
    resolve, wrap_as_ctas, QueryClassifier, QueryExecutor, QueryOptions, ResolvedQuery,
    SubmitContext,
};
use crate::rows::{open_rows, Rows, RowsConfig};

/// A handle for running statements against one database and workgroup.
///
/// Each call is independent; a connection may serve concurrent calls.
pub struct Connection {
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ObjectStore>,
    config: ConnectionConfig,
    executor: QueryExecutor,
    classifier: QueryClassifier,
    output_location: OnceCell<OutputLocation>,
}

impl Connection {
    /// Creates a connection. A configured output location is parsed here;
    /// otherwise the workgroup's location is looked up on first use.
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ObjectStore>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let output_location = match &config.output_location {
            Some(location) => OnceCell::new_with(Some(OutputLocation::parse(location)?)),
            None => OnceCell::new(),
        };
        let executor = QueryExecutor::new(engine.clone(), config.poll_frequency());

        info!("Opened connection to {}", config.display_string());
        Ok(Self {
            engine,
            store,
            config,
            executor,
            classifier: QueryClassifier::default(),
            output_location,
        })
    }

    /// Replaces the classification rules.
    pub fn with_classifier(mut self, classifier: QueryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Runs a statement and returns a cursor over its rows.
    ///
    /// Bound arguments are not supported; substitute values into the text
    /// before calling.
    pub async fn query(&self, sql: &str, args: &[Value], options: QueryOptions) -> Result<Rows> {
        reject_args(args)?;

        let kind = self.classifier.classify(sql);
        let resolved = resolve(&self.config, &options, kind)?;
        let location = self.output_location().await?;
        let context = self.submit_context(&resolved, location);

        let (statement, ctas_table, cleanup) = if resolved.uses_ctas() {
            let rewrite = wrap_as_ctas(sql);
            let cleanup = rewrite.cleanup(self.executor.clone(), context.clone());
            debug!("Materializing into temporary table {}", rewrite.table);
            (rewrite.query, Some(rewrite.table), Some(cleanup))
        } else {
            (sql.to_string(), None, None)
        };

        info!("Running {} query in {} mode", resolved.kind, resolved.mode);
        let execution_id = self
            .executor
            .run(&statement, &context, &resolved.interrupt)
            .await?;

        let config = RowsConfig {
            execution_id,
            mode: resolved.mode,
            kind: resolved.kind,
            output_location: location.clone(),
            database: self.config.database().to_string(),
            catalog: resolved.catalog,
            timeout: resolved.timeout,
            interrupt: resolved.interrupt,
            ctas_table,
            cleanup,
        };
        open_rows(self.engine.clone(), self.store.clone(), config).await
    }

    /// Runs a statement for its effect and discards the rows.
    pub async fn execute(&self, sql: &str, args: &[Value], options: QueryOptions) -> Result<()> {
        let mut rows = self.query(sql, args, options).await?;
        rows.close()
    }

    /// Transactions are not supported by the engine.
    pub fn begin(&self) -> Result<()> {
        Err(AthenaError::unsupported("transactions are not supported"))
    }

    /// The output location, resolved from the workgroup once if not configured.
    async fn output_location(&self) -> Result<&OutputLocation> {
        self.output_location
            .get_or_try_init(|| async {
                let workgroup = self.config.workgroup();
                let location = self
                    .engine
                    .workgroup_output_location(workgroup)
                    .await?
                    .ok_or_else(|| {
                        AthenaError::config(format!(
                            "No output location configured and workgroup '{workgroup}' has none"
                        ))
                    })?;
                debug!("Using output location {} of workgroup {}", location, workgroup);
                OutputLocation::parse(&location)
            })
            .await
    }

    fn submit_context(&self, resolved: &ResolvedQuery, location: &OutputLocation) -> SubmitContext {
        SubmitContext {
            database: self.config.database().to_string(),
            catalog: resolved.catalog.clone(),
            output_location: location.to_string(),
            workgroup: self.config.workgroup().to_string(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("output_location", &self.output_location.get())
            .finish()
    }
}

fn reject_args(args: &[Value]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(AthenaError::unsupported(format!(
            "bound arguments are not supported ({} given)",
            args.len()
        )))
    }
}
