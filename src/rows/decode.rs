//! Decoders for downloaded result files.
//!
//! Three formats are handled: the CSV written for every execution, the CTAS
//! manifest listing data files, and the data files themselves (gzip-compressed
//! text with `\u{1}`-separated fields and one record per line, no quoting).

use std::io::{BufRead, BufReader, Read};

use flate2::read::MultiGzDecoder;

use crate::error::{AthenaError, Result};

/// Field separator in CTAS text data files.
pub const FIELD_SEPARATOR: char = '\u{1}';

/// Raw rows: one `Vec<String>` per record.
pub type RawRows = Vec<Vec<String>>;

/// Splits one record into fields.
///
/// An empty line is a record with a single empty field, and a trailing
/// separator yields a trailing empty field.
pub fn decode_record(line: &str) -> Vec<String> {
    line.split(FIELD_SEPARATOR).map(str::to_string).collect()
}

/// Decodes newline-separated records.
pub fn decode_records<R: BufRead>(reader: R) -> Result<RawRows> {
    reader
        .lines()
        .map(|line| {
            line.map(|l| decode_record(&l))
                .map_err(|e| AthenaError::download(format!("invalid record: {e}")))
        })
        .collect()
}

/// Returns true if the data starts with the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decodes a data file, decompressing it first when it is gzip.
pub fn decode_data_file(data: &[u8]) -> Result<RawRows> {
    if is_gzip(data) {
        decode_records(BufReader::new(MultiGzDecoder::new(data)))
    } else {
        decode_records(data)
    }
}

/// Parses a manifest into its non-blank entries, in listing order.
pub fn parse_manifest(data: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| AthenaError::download(format!("manifest is not valid UTF-8: {e}")))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parses an execution's CSV result file, dropping the header row.
pub fn parse_csv_records<R: Read>(reader: R) -> Result<RawRows> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| AthenaError::download(format!("invalid CSV result: {e}")))
        })
        .collect()
}
