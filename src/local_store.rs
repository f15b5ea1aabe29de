//! Filesystem-backed object store: one directory per bucket under a root.
//!
//! Layout:
//!   <root>/<bucket>/<key...>               (objects)
//!   <root>/<bucket>/.staging/<token>.inprogress  (temp, never listed)
//!
//! `put` and `copy` write the full body into the staging area, fsync it, then rename it
//! over the destination. Rename within one volume is atomic, so a reader opening the
//! destination sees either the old or the new object.

use crate::error::StorageError;
use crate::store::{validate_key, ObjectStore};
use crate::util::{copy_with_backoff, read_with_backoff, remove_with_backoff, rename_with_backoff, write_synced_with_backoff};
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const STAGING_DIR: &str = ".staging";

#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(StorageError::InvalidKey { key: bucket.to_string(), reason: "invalid bucket name" });
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        if key == STAGING_DIR || key.starts_with(".staging/") {
            return Err(StorageError::InvalidKey { key: key.to_string(), reason: "reserved prefix" });
        }
        let mut p = self.bucket_dir(bucket)?;
        for seg in key.split('/') {
            p.push(seg);
        }
        Ok(p)
    }

    fn staging_path(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let dir = self.bucket_dir(bucket)?.join(STAGING_DIR);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let token: u64 = rand::thread_rng().gen();
        Ok(dir.join(format!("{:016x}.inprogress", token)))
    }

    /// Move a fully written staging file over `dest`.
    fn promote_staged(&self, staged: &Path, dest: &Path) -> Result<(), StorageError> {
        let res = ensure_parent(dest).and_then(|_| rename_with_backoff(staged, dest).map_err(|e| StorageError::io(dest, e)));
        if res.is_err() {
            let _ = remove_with_backoff(staged);
        }
        res
    }

    /// Remove now-empty directories between `path` and the bucket root,
    /// mirroring how prefixes vanish from a flat object namespace.
    fn prune_empty_parents(&self, bucket_dir: &Path, path: &Path) {
        let mut cur = path.parent();
        while let Some(dir) = cur {
            if dir == bucket_dir || !dir.starts_with(bucket_dir) {
                break;
            }
            if fs::remove_dir(dir).is_err() {
                break;
            }
            cur = dir.parent();
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e)),
        None => Ok(()),
    }
}

fn not_found_or_io(bucket: &str, key: &str, path: &Path, e: io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() }
    } else {
        StorageError::io(path, e)
    }
}

impl ObjectStore for LocalObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        read_with_backoff(&path).map_err(|e| not_found_or_io(bucket, key, &path, e))
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let dest = self.object_path(bucket, key)?;
        let staged = self.staging_path(bucket)?;
        if let Err(e) = write_synced_with_backoff(&staged, body) {
            let _ = remove_with_backoff(&staged);
            return Err(StorageError::io(&staged, e));
        }
        self.promote_staged(&staged, &dest)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !(e.depth() == 1 && e.file_name() == STAGING_DIR));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                StorageError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&dir) else { continue };
            // Names that are not UTF-8 cannot be addressed by a key.
            let Some(parts) = rel.components().map(|c| c.as_os_str().to_str()).collect::<Option<Vec<_>>>() else {
                tracing::warn!("skipping non-UTF-8 object path {}", entry.path().display());
                continue;
            };
            let key = parts.join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn copy(&self, bucket: &str, src_key: &str, dest_key: &str) -> Result<(), StorageError> {
        let src = self.object_path(bucket, src_key)?;
        let dest = self.object_path(bucket, dest_key)?;
        if !src.is_file() {
            return Err(StorageError::NotFound { bucket: bucket.to_string(), key: src_key.to_string() });
        }
        let staged = self.staging_path(bucket)?;
        if let Err(e) = copy_with_backoff(&src, &staged) {
            let _ = remove_with_backoff(&staged);
            return Err(not_found_or_io(bucket, src_key, &src, e));
        }
        self.promote_staged(&staged, &dest)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        remove_with_backoff(&path).map_err(|e| StorageError::io(&path, e))?;
        self.prune_empty_parents(&self.bucket_dir(bucket)?, &path);
        Ok(())
    }
}
