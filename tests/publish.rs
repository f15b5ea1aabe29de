#[path = "common/mod.rs"]
mod common;

use common::*;
use std::io;
use titanic_etl::*;

fn table(rows: &[[&str; 5]]) -> OutputTable {
    OutputTable {
        columns: OUTPUT_COLUMNS.to_vec(),
        rows: rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect(),
    }
}

/// Delegates to a memory store but refuses every copy.
struct CopyFails(MemoryObjectStore);

impl ObjectStore for CopyFails {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> { self.0.get(bucket, key) }
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> { self.0.put(bucket, key, body) }
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> { self.0.list(bucket, prefix) }
    fn copy(&self, _bucket: &str, _src: &str, dest: &str) -> Result<(), StorageError> {
        Err(StorageError::Io { path: dest.into(), source: io::Error::new(io::ErrorKind::Other, "copy refused") })
    }
    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> { self.0.delete(bucket, key) }
}

/// Delegates to a memory store but refuses every delete.
struct DeleteFails(MemoryObjectStore);

impl ObjectStore for DeleteFails {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> { self.0.get(bucket, key) }
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> { self.0.put(bucket, key, body) }
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> { self.0.list(bucket, prefix) }
    fn copy(&self, bucket: &str, src: &str, dest: &str) -> Result<(), StorageError> { self.0.copy(bucket, src, dest) }
    fn delete(&self, _bucket: &str, key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io { path: key.into(), source: io::Error::new(io::ErrorKind::Other, "delete refused") })
    }
}

/// Full protocol: one temp shard + marker, promoted, then the temp prefix is emptied.
#[test]
fn publish_promotes_single_object_and_clears_temp() {
    let store = MemoryObjectStore::new();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);

    let out = table(&[["0", "1", "0", "0", "0"], ["1", "0", "1", "1", "1"]]);
    let published = publisher.publish(Partition::Train, &out, TRAIN_OUT).unwrap();

    assert_eq!(published.temp_prefix, "titanic-data/processed/temp_train_tok0000");
    assert_eq!(published.rows, 2);
    assert_eq!(read_text(&store, PROCESSED, TRAIN_OUT), "0,1,0,0,0\n1,0,1,1,1\n");
    assert_eq!(store.list(PROCESSED, "").unwrap(), vec![TRAIN_OUT.to_string()]);
}

#[test]
fn publish_overwrites_previous_canonical_object() {
    let store = MemoryObjectStore::new();
    store.put(PROCESSED, TRAIN_OUT, b"stale\n").unwrap();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);

    publisher.publish(Partition::Train, &table(&[["1", "0", "2", "2", "1"]]), TRAIN_OUT).unwrap();
    assert_eq!(read_text(&store, PROCESSED, TRAIN_OUT), "1,0,2,2,1\n");
}

/// A shard set is ambiguous: nothing is copied and the canonical key keeps its content.
#[test]
fn multiple_shards_are_rejected() {
    let store = MemoryObjectStore::new();
    store.put(PROCESSED, TRAIN_OUT, b"previous\n").unwrap();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);

    let prefix = publisher.temp_prefix(Partition::Train, "abc123");
    let out = table(&[["0", "1", "0", "0", "0"], ["1", "0", "1", "1", "1"], ["0", "1", "2", "2", "0"]]);
    let written = write_shards(&store, Partition::Train, PROCESSED, &prefix, &out, 3, "abc123").unwrap();
    assert_eq!(written.len(), 3);

    match publisher.promote(Partition::Train, &prefix, TRAIN_OUT).unwrap_err() {
        PipelineError::MultipleOutputFiles { keys, prefix: p, .. } => {
            assert_eq!(keys, written);
            assert_eq!(p, prefix);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(read_text(&store, PROCESSED, TRAIN_OUT), "previous\n");
}

#[test]
fn nothing_to_promote_is_an_empty_partition() {
    let store = MemoryObjectStore::new();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);

    let err = publisher.publish(Partition::Test, &OutputTable::default(), TEST_OUT).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyPartition { partition: Partition::Test, stage: "publish" }));
    assert!(store.get(PROCESSED, TEST_OUT).is_err());
}

/// The marker and any non-`part-*.csv` object are not candidates for promotion.
#[test]
fn only_part_files_count_as_data() {
    assert!(is_data_object("a/temp_train_x/part-00000-tok0001.csv"));
    assert!(is_data_object("part-00012.csv"));
    assert!(!is_data_object("a/temp_train_x/_SUCCESS"));
    assert!(!is_data_object("a/temp_train_x/.part-00000-tok0001.csv.crc"));
    assert!(!is_data_object("a/temp_train_x/notes.csv"));
}

/// A failed copy leaves the canonical object as it was, and the temp object orphaned.
#[test]
fn failed_copy_leaves_canonical_untouched() {
    let store = CopyFails(MemoryObjectStore::new());
    store.put(PROCESSED, TEST_OUT, b"previous\n").unwrap();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);

    let out = table(&[["1", "0", "1", "1", "0"]]);
    match publisher.publish(Partition::Test, &out, TEST_OUT).unwrap_err() {
        PipelineError::StorageOperation { op, key, .. } => {
            assert_eq!(op, "copy");
            assert_eq!(key, TEST_OUT);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(read_text(&store, PROCESSED, TEST_OUT), "previous\n");
    let leftovers = store.list(PROCESSED, "titanic-data/processed/temp_test_tok0000/").unwrap();
    assert_eq!(leftovers.len(), 2);
}

#[test]
fn republishing_is_byte_identical_across_tokens() {
    let store = MemoryObjectStore::new();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);
    let out = table(&[["0", "1", "2", "2", "0"], ["1", "0", "0", "1", "1"]]);

    let first = publisher.publish(Partition::Train, &out, TRAIN_OUT).unwrap();
    let bytes_first = store.get(PROCESSED, TRAIN_OUT).unwrap();
    let second = publisher.publish(Partition::Train, &out, TRAIN_OUT).unwrap();
    let bytes_second = store.get(PROCESSED, TRAIN_OUT).unwrap();

    assert_ne!(first.temp_prefix, second.temp_prefix);
    assert_eq!(bytes_first, bytes_second);
}

/// Cleanup failing after the copy leaves orphaned temp objects but a complete canonical object.
#[test]
fn failed_cleanup_keeps_new_canonical_object() {
    let store = DeleteFails(MemoryObjectStore::new());
    store.put(PROCESSED, TRAIN_OUT, b"previous\n").unwrap();
    let tokens = CountingTokens::default();
    let publisher = Publisher::new(&store, &tokens, PROCESSED, PREFIX);

    let out = table(&[["0", "1", "2", "0", "1"]]);
    match publisher.publish(Partition::Train, &out, TRAIN_OUT).unwrap_err() {
        PipelineError::StorageOperation { op, .. } => assert_eq!(op, "delete"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(read_text(&store, PROCESSED, TRAIN_OUT), "0,1,2,0,1\n");
    let leftovers = store.list(PROCESSED, "titanic-data/processed/temp_train_tok0000/").unwrap();
    assert_eq!(
        leftovers,
        vec![
            "titanic-data/processed/temp_train_tok0000/_SUCCESS".to_string(),
            "titanic-data/processed/temp_train_tok0000/part-00000-tok0000.csv".to_string(),
        ]
    );
}
