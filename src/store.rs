//! Object storage abstraction: the five primitives the pipeline relies on
//! (get/put/list/copy/delete), plus an in-memory backend.
//!
//! There is deliberately no `rename`: promotion is built from `copy` + `delete`
//! (see `publish`). Implementations must make `put` and `copy` all-or-nothing
//! for the destination key, so readers observe either the previous or the new bytes.

use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub trait ObjectStore: Send + Sync {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError>;
    /// All keys starting with `prefix`, sorted ascending.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;
    /// Server-side copy within one bucket, overwriting `dest_key`.
    fn copy(&self, bucket: &str, src_key: &str, dest_key: &str) -> Result<(), StorageError>;
    /// Deleting a missing key is not an error.
    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// Keys are `/`-separated relative paths without empty, `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason| Err(StorageError::InvalidKey { key: key.to_string(), reason });
    if key.is_empty() {
        return invalid("empty");
    }
    if key.starts_with('/') || key.ends_with('/') {
        return invalid("leading or trailing '/'");
    }
    for seg in key.split('/') {
        match seg {
            "" => return invalid("empty path segment"),
            "." | ".." => return invalid("relative path segment"),
            _ => {}
        }
    }
    Ok(())
}

/// In-process object store. Each operation holds one lock, so `put`/`copy` are atomic.
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.buckets
            .lock()
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned()
            .ok_or_else(|| StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() })
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.to_vec());
        Ok(())
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let guard = self.buckets.lock();
        let Some(objects) = guard.get(bucket) else { return Ok(Vec::new()) };
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn copy(&self, bucket: &str, src_key: &str, dest_key: &str) -> Result<(), StorageError> {
        validate_key(dest_key)?;
        let mut guard = self.buckets.lock();
        let objects = guard.get_mut(bucket).ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: src_key.to_string(),
        })?;
        let body = objects.get(src_key).cloned().ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: src_key.to_string(),
        })?;
        objects.insert(dest_key.to_string(), body);
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        if let Some(objects) = self.buckets.lock().get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }
}
