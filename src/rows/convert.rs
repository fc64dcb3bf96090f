//! Conversion of raw string fields into typed values.
//!
//! Column types come from two sources with different vocabularies: the
//! result-set metadata (`varchar`, `integer`, ...) and the data catalog
//! (`string`, `int`, `varchar(10)`, `array<int>`, ...). Both are normalized to a
//! [`ColumnKind`] for conversion only; the raw type name is what cursors expose.

use crate::engine::{ColumnInfo, Row, Value};
use crate::error::{AthenaError, Result};

/// Which metadata source a cursor's type names come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeVocabulary {
    /// Result-set metadata returned with query results (API and direct download).
    ResultSet,
    /// Data catalog table metadata (compressed download).
    Catalog,
}

/// Value family a declared type converts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ColumnKind {
    /// Normalizes a type name from either vocabulary.
    pub fn from_type_name(type_name: &str) -> Self {
        let base = type_name
            .split(&['(', '<'][..])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "boolean" => Self::Bool,
            "tinyint" | "smallint" | "int" | "integer" | "bigint" => Self::Int,
            "float" | "real" | "double" => Self::Float,
            _ => Self::Text,
        }
    }
}

/// How a source encodes NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullEncoding {
    /// Only an absent cell is NULL.
    Absent,
    /// An empty field in a non-text column is NULL.
    EmptyField,
    /// `\N` is NULL; an empty field in a non-text column is NULL too.
    Marker,
}

/// Hive text-file NULL marker.
pub const NULL_MARKER: &str = "\\N";

fn is_null(raw: &str, kind: ColumnKind, nulls: NullEncoding) -> bool {
    match nulls {
        NullEncoding::Absent => false,
        NullEncoding::EmptyField => raw.is_empty() && kind != ColumnKind::Text,
        NullEncoding::Marker => raw == NULL_MARKER || (raw.is_empty() && kind != ColumnKind::Text),
    }
}

/// Converts one field according to its column's declared type.
pub fn convert_field(column: &ColumnInfo, raw: Option<&str>, nulls: NullEncoding) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };

    let kind = ColumnKind::from_type_name(&column.data_type);
    if is_null(raw, kind, nulls) {
        return Ok(Value::Null);
    }

    let invalid = || {
        AthenaError::conversion(format!(
            "column '{}' ({}): cannot convert '{}'",
            column.name, column.data_type, raw
        ))
    };

    match kind {
        ColumnKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ColumnKind::Int => raw.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid()),
        ColumnKind::Float => raw.trim().parse::<f64>().map(Value::Float).map_err(|_| invalid()),
        ColumnKind::Text => Ok(Value::String(raw.to_string())),
    }
}

/// Converts a row of raw string fields.
///
/// Missing trailing fields are NULL; surplus fields are an error.
pub fn convert_row<S: AsRef<str>>(
    columns: &[ColumnInfo],
    raw: &[S],
    nulls: NullEncoding,
) -> Result<Row> {
    if raw.len() > columns.len() {
        return Err(AthenaError::conversion(format!(
            "row has {} fields but the result has {} columns",
            raw.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| convert_field(column, raw.get(i).map(AsRef::as_ref), nulls))
        .collect()
}

/// Converts a row of optional cells, as returned by the result-set API.
pub fn convert_cells(columns: &[ColumnInfo], cells: &[Option<String>]) -> Result<Row> {
    if cells.len() > columns.len() {
        return Err(AthenaError::conversion(format!(
            "row has {} fields but the result has {} columns",
            cells.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            convert_field(
                column,
                cells.get(i).and_then(|c| c.as_deref()),
                NullEncoding::Absent,
            )
        })
        .collect()
}
