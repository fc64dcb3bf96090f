//! Output location parsing and result object naming.

use std::fmt;

use url::Url;

use crate::error::{AthenaError, Result};

/// A parsed `s3://bucket/prefix/` output location.
///
/// The prefix is either empty or ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    bucket: String,
    prefix: String,
}

/// A single object in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl OutputLocation {
    /// Parses an output location URL.
    pub fn parse(location: &str) -> Result<Self> {
        let (bucket, key) = split_s3_url(location)
            .map_err(|e| AthenaError::config(format!("Invalid output location '{location}': {e}")))?;

        let mut prefix = key.to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The CSV file an execution writes its result set to.
    pub fn result_object(&self, execution_id: &str) -> ObjectRef {
        self.object(format!("{execution_id}.csv"))
    }

    /// The manifest a CTAS execution writes next to its data files.
    pub fn manifest_object(&self, execution_id: &str) -> ObjectRef {
        self.object(format!("tables/{execution_id}-manifest.csv"))
    }

    /// Resolves one manifest line to an object.
    ///
    /// Absolute `s3://` entries name their object directly; anything else is
    /// relative to this location's prefix.
    pub fn manifest_entry(&self, entry: &str) -> Result<ObjectRef> {
        if entry.starts_with("s3://") {
            let (bucket, key) = split_s3_url(entry).map_err(|e| {
                AthenaError::download(format!("Invalid manifest entry '{entry}': {e}"))
            })?;
            return Ok(ObjectRef {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(self.object(entry.trim_start_matches('/')))
    }

    fn object(&self, relative: impl AsRef<str>) -> ObjectRef {
        ObjectRef {
            bucket: self.bucket.clone(),
            key: format!("{}{}", self.prefix, relative.as_ref()),
        }
    }
}

/// Splits `s3://bucket/key` into bucket and raw key.
///
/// The key is taken verbatim: no percent-decoding, and `#` or `?` are part of
/// the key. `url` only validates the scheme and bucket.
fn split_s3_url(location: &str) -> std::result::Result<(&str, &str), String> {
    let location = location.trim();
    let url = Url::parse(location).map_err(|e| e.to_string())?;
    if url.scheme() != "s3" {
        return Err(format!("unsupported scheme '{}', expected 's3'", url.scheme()));
    }

    let rest = location.split_once("://").map_or("", |(_, rest)| rest);
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err("no bucket".to_string());
    }
    Ok((bucket, key.trim_start_matches('/')))
}

impl fmt::Display for OutputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_only() {
        let loc = OutputLocation::parse("s3://results").unwrap();
        assert_eq!(loc.bucket(), "results");
        assert_eq!(loc.prefix(), "");
        assert_eq!(loc.to_string(), "s3://results/");
    }

    #[test]
    fn test_parse_prefix_normalized() {
        let loc = OutputLocation::parse("s3://results/athena/staging").unwrap();
        assert_eq!(loc.prefix(), "athena/staging/");

        let same = OutputLocation::parse("s3://results/athena/staging/").unwrap();
        assert_eq!(loc, same);
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = OutputLocation::parse("gs://results/x").unwrap_err();
        assert!(err.to_string().contains("expected 's3'"));
        assert!(OutputLocation::parse("not a url").is_err());
    }

    #[test]
    fn test_derived_keys() {
        let loc = OutputLocation::parse("s3://results/out/").unwrap();
        assert_eq!(loc.result_object("q-1").key, "out/q-1.csv");
        assert_eq!(loc.manifest_object("q-1").key, "out/tables/q-1-manifest.csv");
        assert_eq!(loc.manifest_object("q-1").bucket, "results");
    }

    #[test]
    fn test_manifest_entry_absolute_and_relative() {
        let loc = OutputLocation::parse("s3://results/out/").unwrap();

        let absolute = loc
            .manifest_entry("s3://results/out/tables/q-1/20240101_000000_00001.gz")
            .unwrap();
        assert_eq!(absolute.bucket, "results");
        assert_eq!(absolute.key, "out/tables/q-1/20240101_000000_00001.gz");

        let relative = loc.manifest_entry("t1").unwrap();
        assert_eq!(relative.key, "out/t1");
        assert_eq!(relative.to_string(), "s3://results/out/t1");
    }

    #[test]
    fn test_prefix_with_space_is_kept_raw() {
        let loc = OutputLocation::parse("s3://results/my results/").unwrap();
        assert_eq!(loc.prefix(), "my results/");
        assert_eq!(loc.result_object("q-1").key, "my results/q-1.csv");
        assert_eq!(loc.to_string(), "s3://results/my results/");
    }

    #[test]
    fn test_manifest_entry_keeps_special_characters() {
        let loc = OutputLocation::parse("s3://results/out/").unwrap();

        let absolute = loc.manifest_entry("s3://results/out/part #1.gz").unwrap();
        assert_eq!(absolute.bucket, "results");
        assert_eq!(absolute.key, "out/part #1.gz");

        let query_like = loc.manifest_entry("s3://results/out/a?b=1%20c").unwrap();
        assert_eq!(query_like.key, "out/a?b=1%20c");

        assert_eq!(loc.manifest_entry("part #2.gz").unwrap().key, "out/part #2.gz");
    }

    #[test]
    fn test_manifest_entry_without_bucket() {
        let loc = OutputLocation::parse("s3://results/out/").unwrap();
        let err = loc.manifest_entry("s3:///out/x.gz").unwrap_err();
        assert_eq!(err.category(), "Download Error");
    }
}
