#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use titanic_etl::{ObjectStore, TokenSource};

pub const RAW: &str = "raw";
pub const PROCESSED: &str = "processed";
pub const PREFIX: &str = "titanic-data/processed";
pub const TRAIN_OUT: &str = "titanic-data/processed/train_processed.csv";
pub const TEST_OUT: &str = "titanic-data/processed/test_processed.csv";

/// Train rows of the worked example plus one row with a missing Age (must be dropped
/// and must not influence the fit). Names contain quoted commas on purpose.
pub const TRAIN_CSV: &str = "\
PassengerId,Survived,Pclass,Name,Sex,Age,SibSp,Parch,Ticket,Fare,Cabin,Embarked
1,0,3,\"Braund, Mr. Owen Harris\",male,20,1,0,A/5 21171,10,,S
2,1,1,\"Cumings, Mrs. John Bradley\",female,40,1,0,PC 17599,20,C85,C
3,0,3,\"Allen, Mr. William Henry\",male,60,0,0,373450,30,,S
4,1,3,\"Moran, Miss. Kate\",female,,0,0,330877,99,,Q
";

/// Test partition without a label column. The second row lies outside the train
/// range; the third has no Embarked and is dropped.
pub const TEST_CSV: &str = "\
PassengerId,Pclass,Name,Sex,Age,SibSp,Parch,Ticket,Fare,Cabin,Embarked
892,3,\"Kelly, Mrs. Anna\",female,30,0,0,330911,20,,Q
893,3,\"Wilkes, Mr. James\",male,70,1,0,363272,5,,S
894,2,\"Myles, Mr. Thomas Francis\",male,62,0,0,240276,9.69,,
";

pub const TRAIN_EXPECTED: &str = "0,1,0,0,0\n1,0,1,1,1\n0,1,2,2,0\n";
pub const TEST_EXPECTED: &str = "1,0,1,1\n0,1,3,-1\n";

/// Deterministic, still unique-per-call tokens (`tok0000`, `tok0001`, ...).
#[derive(Default)]
pub struct CountingTokens {
    next: AtomicUsize,
}

impl TokenSource for CountingTokens {
    fn next_token(&self) -> String {
        format!("tok{:04}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn seed_inputs(store: &dyn ObjectStore, train: &str, test: &str) {
    store.put(RAW, "train.csv", train.as_bytes()).unwrap();
    store.put(RAW, "test.csv", test.as_bytes()).unwrap();
}

pub fn read_text(store: &dyn ObjectStore, bucket: &str, key: &str) -> String {
    String::from_utf8(store.get(bucket, key).unwrap()).unwrap()
}

pub fn zstd_compress(body: &str) -> Vec<u8> {
    let mut enc = zstd::stream::write::Encoder::new(Vec::new(), 3).unwrap();
    enc.write_all(body.as_bytes()).unwrap();
    enc.finish().unwrap()
}
