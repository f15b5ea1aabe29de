//! Sharded writer: serializes an output table as `part-NNNNN-<token>.csv` objects under
//! a prefix, one per shard, followed by an empty `_SUCCESS` marker.
//!
//! Shards are serialized and uploaded in parallel. With `shards == 1` the whole table
//! lands in a single object, which is what the publisher requires.

use crate::config::{join_key, Partition};
use crate::error::PipelineError;
use crate::store::ObjectStore;
use crate::table::{write_delimited, OutputTable};
use rayon::prelude::*;
use regex::Regex;
use std::sync::OnceLock;

pub const SUCCESS_MARKER: &str = "_SUCCESS";

pub fn shard_name(index: usize, token: &str) -> String {
    format!("part-{:05}-{}.csv", index, token)
}

/// True for data objects produced by the writer (markers and checksum files excluded).
pub fn is_data_object(key: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^part-\d{5}(-[0-9A-Za-z]+)?\.csv$").expect("static regex"));
    let name = key.rsplit('/').next().unwrap_or(key);
    re.is_match(name)
}

/// Write `table` under `prefix` split into at most `shards` contiguous row ranges.
/// Returns the data keys written, in shard order. An empty table writes only the marker.
pub fn write_shards(
    store: &dyn ObjectStore,
    partition: Partition,
    bucket: &str,
    prefix: &str,
    table: &OutputTable,
    shards: usize,
    token: &str,
) -> Result<Vec<String>, PipelineError> {
    let shards = shards.max(1);
    let chunk = table.len().div_ceil(shards).max(1);

    let keys = table
        .rows
        .par_chunks(chunk)
        .enumerate()
        .map(|(i, rows)| -> Result<String, PipelineError> {
            let body = write_delimited(rows)
                .map_err(|e| PipelineError::MalformedInput { partition, detail: format!("serialize shard {}: {}", i, e) })?;
            let key = join_key(prefix, &shard_name(i, token));
            store.put(bucket, &key, &body).map_err(|e| PipelineError::storage("put", bucket, &key, e))?;
            Ok(key)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let marker = join_key(prefix, SUCCESS_MARKER);
    store.put(bucket, &marker, b"").map_err(|e| PipelineError::storage("put", bucket, &marker, e))?;

    tracing::debug!("{}: wrote {} shard(s) under {}/{}", partition, keys.len(), bucket, prefix);
    Ok(keys)
}
