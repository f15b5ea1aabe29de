use serde::Serialize;
use std::fmt;

/// Which of the two row-sets a run is working on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Test,
}

impl Partition {
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Test => "test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PrepOptions {
    pub raw_bucket: String,
    pub processed_bucket: String,
    pub train_key: String,
    pub test_key: String,
    pub processed_prefix: String, // no leading/trailing '/'
    pub parallelism: Option<usize>, // Some(N) to set rayon threads, None to use default
    pub progress: bool,             // show stage progress bar
}

impl Default for PrepOptions {
    fn default() -> Self {
        Self {
            raw_bucket: "titanic-raw".to_string(),
            processed_bucket: "titanic-processed".to_string(),
            train_key: "train.csv".to_string(),
            test_key: "test.csv".to_string(),
            processed_prefix: "titanic-data/processed".to_string(),
            parallelism: None,
            progress: false,
        }
    }
}

impl PrepOptions {
    pub fn with_raw_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.raw_bucket = bucket.into();
        self
    }
    pub fn with_processed_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.processed_bucket = bucket.into();
        self
    }
    pub fn with_train_key(mut self, key: impl Into<String>) -> Self {
        self.train_key = key.into();
        self
    }
    pub fn with_test_key(mut self, key: impl Into<String>) -> Self {
        self.test_key = key.into();
        self
    }
    pub fn with_processed_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.processed_prefix = prefix.as_ref().trim_matches('/').to_string();
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Apply per-invocation overrides from the environment:
    /// - PREP_RAW_BUCKET, PREP_PROCESSED_BUCKET
    /// - PREP_TRAIN_KEY, PREP_TEST_KEY
    /// - PREP_PROCESSED_PREFIX
    /// Blank values are ignored.
    pub fn merge_env(self) -> Self {
        self.merge_from(|name| std::env::var(name).ok())
    }

    pub(crate) fn merge_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = get("PREP_RAW_BUCKET") {
            self = self.with_raw_bucket(v);
        }
        if let Some(v) = get("PREP_PROCESSED_BUCKET") {
            self = self.with_processed_bucket(v);
        }
        if let Some(v) = get("PREP_TRAIN_KEY") {
            self = self.with_train_key(v);
        }
        if let Some(v) = get("PREP_TEST_KEY") {
            self = self.with_test_key(v);
        }
        if let Some(v) = get("PREP_PROCESSED_PREFIX") {
            self = self.with_processed_prefix(v);
        }
        self
    }

    pub fn raw_key(&self, partition: Partition) -> &str {
        match partition {
            Partition::Train => &self.train_key,
            Partition::Test => &self.test_key,
        }
    }

    /// Canonical output key, e.g. `titanic-data/processed/train_processed.csv`.
    pub fn canonical_key(&self, partition: Partition) -> String {
        join_key(&self.processed_prefix, &format!("{}_processed.csv", partition))
    }
}

pub(crate) fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_skip_blank_values() {
        let opts = PrepOptions::default().merge_from(|name| match name {
            "PREP_RAW_BUCKET" => Some("landing".to_string()),
            "PREP_TEST_KEY" => Some("   ".to_string()),
            "PREP_PROCESSED_PREFIX" => Some("/features/v2/".to_string()),
            _ => None,
        });
        assert_eq!(opts.raw_bucket, "landing");
        assert_eq!(opts.test_key, "test.csv");
        assert_eq!(opts.canonical_key(Partition::Test), "features/v2/test_processed.csv");
    }
}
