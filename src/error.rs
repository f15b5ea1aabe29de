//! Error taxonomy for the preprocessing pipeline and the storage layer.

use crate::config::Partition;
use std::io;
use std::path::PathBuf;

/// Failures raised by an `ObjectStore` backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("i/o on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io { path: path.into(), source }
    }
}

/// Every way a partition's pipeline can abort. Each variant carries enough context
/// (partition, column, fitted values, keys) to diagnose without re-running.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{partition}: required column(s) missing: {}", .missing.join(", "))]
    SchemaMismatch { partition: Partition, missing: Vec<String> },

    #[error("{partition}: no rows left after {stage}")]
    EmptyPartition { partition: Partition, stage: &'static str },

    #[error("{partition}: degenerate range for {field}: min == max == {value}")]
    DegenerateRange { partition: Partition, field: &'static str, value: f64 },

    #[error("{partition}: range width of {field} overflows: [{min}, {max}]")]
    UnrepresentableRange { partition: Partition, field: &'static str, min: f64, max: f64 },

    #[error("{partition}: {field} value {value} maps to a category outside the integer range")]
    CategoryOverflow { partition: Partition, field: &'static str, value: f64 },

    #[error("{partition}: {} data objects under {prefix} (expected exactly one): {}", .keys.len(), .keys.join(", "))]
    MultipleOutputFiles { partition: Partition, prefix: String, keys: Vec<String> },

    #[error("{partition}: line {line}: column {column} has non-numeric value {value:?}")]
    InvalidValue { partition: Partition, line: u64, column: &'static str, value: String },

    #[error("{partition}: malformed input: {detail}")]
    MalformedInput { partition: Partition, detail: String },

    #[error("{op} {bucket}/{key} failed")]
    StorageOperation {
        op: &'static str,
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("{partition}: not processed, train failed before stats were fitted")]
    FitUnavailable { partition: Partition },
}

impl PipelineError {
    pub(crate) fn storage(op: &'static str, bucket: &str, key: &str, source: StorageError) -> Self {
        PipelineError::StorageOperation { op, bucket: bucket.to_string(), key: key.to_string(), source }
    }
}

/// Render an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}
