//! Row cursor integration tests.
//!
//! Tests reading rows through each result strategy end to end.

use std::io::Write;

use athena_cursor::engine::{ColumnInfo, MockExecution, ResultPage, Value};
use athena_cursor::rows::{collect_rows, CursorState, TypeVocabulary};
use athena_cursor::{QueryOptions, ResultMode};
use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;

use super::Harness;

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn cell(v: &str) -> Option<String> {
    Some(v.to_string())
}

fn users_columns(int: &str, text: &str) -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", int),
        ColumnInfo::new("name", text),
        ColumnInfo::new("score", "double"),
        ColumnInfo::new("active", "boolean"),
    ]
}

/// Scenario: paging through the result-set API
/// Given a result spread over three pages
/// When the cursor is drained
/// Then rows arrive in order with typed values and absent cells as NULL
#[tokio::test]
async fn test_api_cursor_reads_all_pages() {
    let h = Harness::new();
    let columns = users_columns("integer", "varchar");
    let page = |rows: Vec<Vec<Option<String>>>| ResultPage {
        columns: columns.clone(),
        rows,
        next_token: None,
    };
    h.engine.push_execution(MockExecution::succeeded().with_pages(vec![
        page(vec![vec![cell("1"), cell("ann"), cell("1.5"), cell("true")]]),
        page(vec![]),
        page(vec![vec![cell("2"), None, cell("NaN"), cell("false")]]),
    ]));

    let mut rows = h
        .conn
        .query("SELECT id, name, score, active FROM users", &[], QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(rows.columns(), vec!["id", "name", "score", "active"]);
    assert_eq!(rows.column_type_name(0), Some("integer"));
    assert_eq!(rows.type_vocabulary(), TypeVocabulary::ResultSet);

    let all = collect_rows(rows.as_mut()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(
        all[0],
        vec![
            Value::Int(1),
            Value::String("ann".to_string()),
            Value::Float(1.5),
            Value::Bool(true)
        ]
    );
    assert_eq!(all[1][0], Value::Int(2));
    assert_eq!(all[1][1], Value::Null);
    assert!(matches!(all[1][2], Value::Float(f) if f.is_nan()));
    assert_eq!(rows.state(), CursorState::Closed);
}

/// Scenario: direct download of the result CSV
/// Then an empty non-text field is NULL and an empty text field is ""
#[tokio::test]
async fn test_download_cursor_reads_csv() {
    let h = Harness::new();
    h.engine.push_execution(MockExecution::succeeded().with_pages(vec![ResultPage {
        columns: users_columns("integer", "varchar"),
        rows: Vec::new(),
        next_token: None,
    }]));
    h.put(
        "exec-1.csv",
        "\"id\",\"name\",\"score\",\"active\"\n\
         \"1\",\"ann, jr\",\"2.0\",\"true\"\n\
         ,\"\",,\n",
    );

    let options = QueryOptions::new().with_result_mode(ResultMode::Download);
    let mut rows = h
        .conn
        .query("SELECT id, name, score, active FROM users", &[], options)
        .await
        .unwrap();
    assert_eq!(rows.result_mode(), ResultMode::Download);

    assert_eq!(
        collect_rows(rows.as_mut()).await.unwrap(),
        vec![
            vec![
                Value::Int(1),
                Value::String("ann, jr".to_string()),
                Value::Float(2.0),
                Value::Bool(true)
            ],
            vec![
                Value::Null,
                Value::String(String::new()),
                Value::Null,
                Value::Null
            ],
        ]
    );
}

/// Scenario: compressed download through a temporary table
/// Given a manifest listing two data files, one absolute and one relative
/// When the cursor is drained
/// Then rows from both files arrive in manifest order, with \N as NULL,
/// and column types come from the catalog
#[tokio::test]
async fn test_gzip_cursor_reads_manifest_files() {
    let h = Harness::new();
    h.engine
        .create_tables_with(users_columns("int", "string"));
    h.put(
        "tables/exec-1-manifest.csv",
        "s3://athena-results/staging/tables/exec-1/a.gz\ntables/exec-1/b.gz\n",
    );
    h.put(
        "tables/exec-1/a.gz",
        gzip("1\u{1}ann\u{1}0.5\u{1}true\n2\u{1}\\N\u{1}\\N\u{1}false\n"),
    );
    h.put("tables/exec-1/b.gz", gzip("3\u{1}\u{1}1\u{1}\\N\n"));

    let options = QueryOptions::new().with_result_mode(ResultMode::GzipDownload);
    let mut rows = h
        .conn
        .query("SELECT id, name, score, active FROM users", &[], options)
        .await
        .unwrap();
    assert_eq!(rows.type_vocabulary(), TypeVocabulary::Catalog);
    assert_eq!(rows.column_type_name(1), Some("string"));

    let all = collect_rows(rows.as_mut()).await.unwrap();
    assert_eq!(
        all,
        vec![
            vec![
                Value::Int(1),
                Value::String("ann".to_string()),
                Value::Float(0.5),
                Value::Bool(true)
            ],
            vec![Value::Int(2), Value::Null, Value::Null, Value::Bool(false)],
            vec![
                Value::Int(3),
                Value::String(String::new()),
                Value::Float(1.0),
                Value::Null
            ],
        ]
    );
}

#[tokio::test]
async fn test_exhausted_cursor_keeps_returning_none() {
    let h = Harness::new();
    h.engine.push_execution(MockExecution::succeeded().with_pages(vec![ResultPage {
        columns: vec![ColumnInfo::new("n", "bigint")],
        rows: vec![vec![cell("9")]],
        next_token: None,
    }]));

    let mut rows = h
        .conn
        .query("SELECT n FROM t", &[], QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(rows.next().await.unwrap(), Some(vec![Value::Int(9)]));
    assert_eq!(rows.next().await.unwrap(), None);
    assert_eq!(rows.next().await.unwrap(), None);
    assert_eq!(rows.state(), CursorState::Exhausted);

    rows.close().unwrap();
    rows.close().unwrap();
    assert!(rows.next().await.is_err());
}
