//! Query lifecycle integration tests.
//!
//! Tests classification, mode resolution, CTAS handling, and cancellation.

use std::time::Duration;

use athena_cursor::engine::{
    ColumnInfo, MockExecution, MockQueryEngine, QueryState, StartQueryRequest,
};
use athena_cursor::query::CTAS_TABLE_PREFIX;
use athena_cursor::{AthenaError, ConnectionConfig, QueryOptions, ResultMode};
use tokio_util::sync::CancellationToken;

use super::{Harness, OUTPUT_LOCATION};

fn gzip_harness() -> Harness {
    Harness::with_config(
        ConnectionConfig::new("sampledb")
            .with_output_location(OUTPUT_LOCATION)
            .with_result_mode(ResultMode::GzipDownload),
    )
}

/// Scenario: DDL under a compressed default
/// Given a connection defaulting to the compressed download mode
/// When a DDL statement runs
/// Then it is submitted verbatim and read through the result-set API
#[tokio::test]
async fn test_ddl_is_forced_to_api_mode() {
    let h = gzip_harness();

    for sql in ["DROP TABLE old_events", "  create table t (a int)", "MSCK REPAIR TABLE t"] {
        let rows = h.conn.query(sql, &[], QueryOptions::new()).await.unwrap();
        assert_eq!(rows.result_mode(), ResultMode::Api, "{sql}");
    }
    assert_eq!(
        h.engine.submitted_queries(),
        vec![
            "DROP TABLE old_events",
            "  create table t (a int)",
            "MSCK REPAIR TABLE t"
        ]
    );
}

/// Scenario: user-written CTAS
/// Given a CTAS statement written by the caller
/// When it runs under the compressed mode
/// Then it is not wrapped into another temporary table
#[tokio::test]
async fn test_user_ctas_is_not_rewritten() {
    let h = gzip_harness();
    let sql = "CREATE TABLE archive AS SELECT * FROM events";

    h.conn.execute(sql, &[], QueryOptions::new()).await.unwrap();
    assert_eq!(h.engine.submitted_queries(), vec![sql]);
}

/// Scenario: only SELECT under the compressed mode is rewritten
#[tokio::test]
async fn test_select_rewrite_depends_on_mode() {
    let h = Harness::new();
    h.put("exec-1.csv", "\"n\"\n\"1\"\n");

    let options = QueryOptions::new().with_result_mode(ResultMode::Download);
    h.conn
        .execute("SELECT n FROM t", &[], options)
        .await
        .unwrap();
    assert_eq!(h.engine.submitted_queries(), vec!["SELECT n FROM t"]);

    let options = QueryOptions::new().with_result_mode(ResultMode::GzipDownload);
    let _ = h.conn.execute("SELECT n FROM t", &[], options).await;
    let queries = h.engine.submitted_queries();
    assert!(queries[1].starts_with(&format!("CREATE TABLE {CTAS_TABLE_PREFIX}")));
    assert!(queries[1].contains("WITH (format='TEXTFILE', write_compression='GZIP')"));
    assert!(queries[1].ends_with("AS SELECT n FROM t"));
}

/// Scenario: temporary table dropped exactly once
/// Given a compressed query whose rows are fetched successfully
/// When the cursor is drained and closed twice
/// Then exactly one DROP TABLE for the temporary table was submitted
#[tokio::test]
async fn test_temporary_table_dropped_once() {
    let h = gzip_harness();
    h.engine
        .create_tables_with(vec![ColumnInfo::new("n", "int")]);
    h.put("tables/exec-1-manifest.csv", "tables/exec-1/part-0.gz\n");
    h.put("tables/exec-1/part-0.gz", "1\n2\n");

    let mut rows = h
        .conn
        .query("SELECT n FROM t", &[], QueryOptions::new())
        .await
        .unwrap();
    while rows.next().await.unwrap().is_some() {}
    rows.close().unwrap();
    rows.close().unwrap();

    let queries = h.engine.submitted_queries();
    let table = queries[0].split_whitespace().nth(2).unwrap().to_string();
    let drops: Vec<&String> = queries.iter().filter(|q| q.starts_with("DROP")).collect();
    assert_eq!(drops, vec![&format!("DROP TABLE {table}")]);
    assert!(!h.engine.has_table(&table));
}

/// Scenario: row fetch fails after the table exists
/// Then the table is still dropped and the fetch error is returned
#[tokio::test]
async fn test_table_dropped_when_fetch_fails() {
    let h = gzip_harness();
    h.engine
        .create_tables_with(vec![ColumnInfo::new("n", "int")]);

    let err = h
        .conn
        .query("SELECT n FROM t", &[], QueryOptions::new())
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "Download Error");

    let queries = h.engine.submitted_queries();
    assert_eq!(queries.len(), 2);
    let table = queries[0].split_whitespace().nth(2).unwrap();
    assert!(!h.engine.has_table(table));
}

#[tokio::test]
async fn test_failed_query_carries_reason() {
    let h = Harness::new();
    h.engine.push_execution(MockExecution::with_states([
        QueryState::Queued,
        QueryState::Running,
    ]));
    h.engine
        .push_execution(MockExecution::failed("HIVE_BAD_DATA: malformed input"));
    h.engine.push_execution(MockExecution::rejected(
        "InvalidRequestException: line 1:1: mismatched input 'SELEC'",
    ));

    // First execution keeps running; a deadline abandons it.
    let options = QueryOptions::new().with_deadline(Duration::from_millis(20));
    let err = h
        .conn
        .execute("SELECT 1", &[], options)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(h.engine.stop_requests(), vec![MockQueryEngine::execution_id(1)]);

    let err = h
        .conn
        .execute("SELECT * FROM broken", &[], QueryOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, AthenaError::execution_failed("HIVE_BAD_DATA: malformed input"));

    let err = h
        .conn
        .execute("SELEC 1", &[], QueryOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AthenaError::submission("InvalidRequestException: line 1:1: mismatched input 'SELEC'")
    );
}

/// Scenario: caller cancels while the query is running
/// Then one stop request is sent and the call reports cancellation
#[tokio::test]
async fn test_cancellation_stops_execution() {
    let h = Harness::new();
    h.engine
        .push_execution(MockExecution::with_states([QueryState::Running]));

    let token = CancellationToken::new();
    let options = QueryOptions::new().with_cancel(token.clone());
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(h.conn.execute("SELECT 1", &[], options), canceller);

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(h.engine.stop_requests().len(), 1);
    assert!(h.engine.poll_count(&MockQueryEngine::execution_id(1)) >= 1);
}

#[tokio::test]
async fn test_unsupported_operations() {
    let h = Harness::new();

    assert_eq!(
        h.conn.begin().unwrap_err().category(),
        "Unsupported Operation"
    );
    let err = h
        .conn
        .query(
            "SELECT * FROM t WHERE id = ?",
            &[athena_cursor::engine::Value::Int(7)],
            QueryOptions::new(),
        )
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "Unsupported Operation");
    assert!(h.engine.submissions().is_empty());
}

/// Scenario: no output location configured
/// Given a workgroup that reports an output location
/// Then submissions use the workgroup's location
#[tokio::test]
async fn test_workgroup_output_location() {
    let h = Harness::with_config(ConnectionConfig::new("sampledb").with_workgroup("analytics"));
    h.engine
        .set_workgroup_location("analytics", "s3://wg-bucket/results");

    h.conn
        .execute("SHOW DATABASES", &[], QueryOptions::new())
        .await
        .unwrap();

    let submitted: Vec<StartQueryRequest> = h.engine.submissions();
    assert_eq!(submitted[0].output_location, "s3://wg-bucket/results/");
    assert_eq!(submitted[0].workgroup, "analytics");
    assert_eq!(submitted[0].database, "sampledb");
}

#[tokio::test]
async fn test_catalog_override_is_submitted() {
    let h = Harness::new();

    let options = QueryOptions::new().with_catalog("lake");
    h.conn
        .execute("SHOW TABLES", &[], options)
        .await
        .unwrap();
    h.conn
        .execute("SHOW TABLES", &[], QueryOptions::new().with_catalog("  "))
        .await
        .unwrap();

    let catalogs: Vec<Option<String>> =
        h.engine.submissions().into_iter().map(|s| s.catalog).collect();
    assert_eq!(catalogs, vec![Some("lake".to_string()), None]);
}
