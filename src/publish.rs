//! Atomic publication of a partition's output to its canonical key.
//!
//! The store has no rename, so promotion is write-to-temp, copy, delete:
//!   1. write the table as exactly one shard under `temp_<partition>_<token>/`
//!   2. list the temp prefix and require exactly one data object
//!   3. copy it over the canonical key (single atomic store operation)
//!   4. delete everything under the temp prefix
//! A failure before 3 leaves the canonical object untouched. A failure in 4 leaves an
//! orphaned temp prefix behind but a complete canonical object.
//!
//! Two runs publishing to the same canonical key are not coordinated; the last copy wins.

use crate::config::{join_key, Partition};
use crate::error::PipelineError;
use crate::shard::{is_data_object, write_shards};
use crate::store::ObjectStore;
use crate::table::OutputTable;
use rand::Rng;
use serde::Serialize;

/// Supplies a token that is unique per call; used to name temp prefixes.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> String;
}

/// 128 random bits rendered as 32 lowercase hex chars.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&self) -> String {
        format!("{:032x}", rand::thread_rng().gen::<u128>())
    }
}

/// Where a partition was published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Published {
    pub bucket: String,
    pub canonical_key: String,
    pub temp_prefix: String,
    pub rows: usize,
}

pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
    tokens: &'a dyn TokenSource,
    bucket: &'a str,
    staging_root: &'a str,
}

impl<'a> Publisher<'a> {
    /// `staging_root` is the key prefix under which `temp_*` prefixes are created.
    pub fn new(store: &'a dyn ObjectStore, tokens: &'a dyn TokenSource, bucket: &'a str, staging_root: &'a str) -> Self {
        Self { store, tokens, bucket, staging_root }
    }

    pub fn temp_prefix(&self, partition: Partition, token: &str) -> String {
        join_key(self.staging_root, &format!("temp_{}_{}", partition, token))
    }

    /// Run the full write → list → copy → delete protocol.
    pub fn publish(&self, partition: Partition, table: &OutputTable, canonical_key: &str) -> Result<Published, PipelineError> {
        let token = self.tokens.next_token();
        let prefix = self.temp_prefix(partition, &token);

        // Consolidate to a single shard before anything is listed.
        write_shards(self.store, partition, self.bucket, &prefix, table, 1, &token)?;
        self.promote(partition, &prefix, canonical_key)?;

        Ok(Published {
            bucket: self.bucket.to_string(),
            canonical_key: canonical_key.to_string(),
            temp_prefix: prefix,
            rows: table.len(),
        })
    }

    /// Steps 2-4: promote the single data object under `temp_prefix` to `canonical_key`
    /// and clear the prefix. Zero or several data objects abort before the copy.
    pub fn promote(&self, partition: Partition, temp_prefix: &str, canonical_key: &str) -> Result<(), PipelineError> {
        let list_prefix = format!("{}/", temp_prefix);
        let listed = self
            .store
            .list(self.bucket, &list_prefix)
            .map_err(|e| PipelineError::storage("list", self.bucket, &list_prefix, e))?;

        let data: Vec<String> = listed.iter().filter(|k| is_data_object(k)).cloned().collect();
        if data.len() > 1 {
            return Err(PipelineError::MultipleOutputFiles { partition, prefix: temp_prefix.to_string(), keys: data });
        }
        let Some(source) = data.first() else {
            return Err(PipelineError::EmptyPartition { partition, stage: "publish" });
        };

        self.store
            .copy(self.bucket, source, canonical_key)
            .map_err(|e| PipelineError::storage("copy", self.bucket, canonical_key, e))?;
        tracing::info!("{}: promoted {}/{} -> {}/{}", partition, self.bucket, source, self.bucket, canonical_key);

        for key in &listed {
            self.store
                .delete(self.bucket, key)
                .map_err(|e| PipelineError::storage("delete", self.bucket, key, e))?;
        }
        tracing::debug!("{}: removed {} temp object(s) under {}", partition, listed.len(), temp_prefix);
        Ok(())
    }
}
