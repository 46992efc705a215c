/*!
Path normalization and validation helpers shared by the storage and
metadata layers (spec §6.1).
*/

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{IcebergError, Result};

lazy_static! {
    static ref PROTOCOL_ROOT: Regex =
        Regex::new(r"^(s3a?|gs|hdfs|file)://[^/]*/").unwrap();
}

/// Strips a known protocol root (`s3://bucket/`, `s3a://bucket/`, `gs://bucket/`,
/// `hdfs://namenode/`, `file://`) or a leading `/` so that keys compare
/// consistently regardless of which scheme a caller used to name the table
/// location.
pub fn strip_protocol_root(path: &str) -> String {
    if let Some(m) = PROTOCOL_ROOT.find(path) {
        path[m.end()..].to_string()
    } else {
        path.trim_start_matches('/').to_string()
    }
}

/// Validates a storage key against the path-safety rules of spec §6.1:
/// no `..` traversal, no percent-encoded traversal, no backslashes, and
/// no mixed `/`/`\` separators.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(IcebergError::InvalidInput("empty path".to_string()));
    }
    if path.contains("..") {
        return Err(IcebergError::InvalidInput(format!(
            "path traversal not allowed: {path}"
        )));
    }
    let lower = path.to_ascii_lowercase();
    if lower.contains("%2e%2e") || lower.contains("%2f") || lower.contains("%5c") {
        return Err(IcebergError::InvalidInput(format!(
            "percent-encoded traversal not allowed: {path}"
        )));
    }
    if path.contains('\\') {
        return Err(IcebergError::InvalidInput(format!(
            "backslash separators not allowed: {path}"
        )));
    }
    Ok(())
}

/// Joins a table location and a relative metadata/data path, normalizing
/// the protocol root and validating the result.
pub fn join_path(location: &str, relative: &str) -> Result<String> {
    let base = strip_protocol_root(location);
    let base = base.trim_end_matches('/');
    let joined = format!("{base}/{relative}");
    validate_path(&joined)?;
    Ok(joined)
}
