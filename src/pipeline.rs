use crate::config::{Partition, PrepOptions};
use crate::encode::{encode_sex, EncodedPassenger};
use crate::error::{error_chain, PipelineError};
use crate::filters::drop_incomplete;
use crate::normalize::{apply_stats, fit_train, NormalizationStats};
use crate::progress::ProgressScope;
use crate::project::project;
use crate::publish::{Published, Publisher, RandomTokens, TokenSource};
use crate::schema::{validate_schema, ColumnLayout};
use crate::store::ObjectStore;
use crate::table::{read_delimited, RawTable};
use crate::util::init_tracing_once;
use serde::Serialize;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// load, validate, filter, encode, transform, project, publish
const STAGES_PER_PARTITION: u64 = 7;

/// Train/test preprocessing run against one object store.
#[derive(Clone)]
pub struct Preprocessor {
    pub(crate) opts: PrepOptions,
    store: Arc<dyn ObjectStore>,
    tokens: Arc<dyn TokenSource>,
}

/// Per-partition summary of a successful publication.
#[derive(Clone, Debug, Serialize)]
pub struct PartitionReport {
    pub partition: Partition,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub has_label: bool,
    pub published: Published,
}

/// Outcome of both partitions. One partition failing does not undo the other.
#[derive(Debug)]
pub struct RunOutcome {
    pub started_at: String,
    pub finished_at: String,
    pub stats: Option<NormalizationStats>,
    pub train: Result<PartitionReport, PipelineError>,
    pub test: Result<PartitionReport, PipelineError>,
}

/// Report of a fully successful run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub stats: NormalizationStats,
    pub train: PartitionReport,
    pub test: PartitionReport,
}

impl RunOutcome {
    /// Collapse into a report; the train error wins when both partitions failed.
    pub fn into_report(self) -> Result<RunReport, PipelineError> {
        let train = self.train?;
        let test = self.test?;
        let stats = self.stats.ok_or(PipelineError::FitUnavailable { partition: Partition::Train })?;
        Ok(RunReport { started_at: self.started_at, finished_at: self.finished_at, stats, train, test })
    }
}

/// A partition that went through validate → filter → encode.
struct Prepared {
    partition: Partition,
    layout: ColumnLayout,
    rows_read: usize,
    rows: Vec<EncodedPassenger>,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

impl Preprocessor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { opts: PrepOptions::default(), store, tokens: Arc::new(RandomTokens) }
    }

    // -------- Builder methods --------
    pub fn options(mut self, opts: PrepOptions) -> Self { self.opts = opts; self }
    pub fn raw_bucket(mut self, bucket: impl Into<String>) -> Self { self.opts = self.opts.with_raw_bucket(bucket); self }
    pub fn processed_bucket(mut self, bucket: impl Into<String>) -> Self { self.opts = self.opts.with_processed_bucket(bucket); self }
    pub fn train_key(mut self, key: impl Into<String>) -> Self { self.opts = self.opts.with_train_key(key); self }
    pub fn test_key(mut self, key: impl Into<String>) -> Self { self.opts = self.opts.with_test_key(key); self }
    pub fn processed_prefix(mut self, prefix: impl AsRef<str>) -> Self { self.opts = self.opts.with_processed_prefix(prefix); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self { self.tokens = tokens; self }

    pub fn opts(&self) -> &PrepOptions {
        &self.opts
    }

    /// Run both partitions and fail if either did. The other partition's canonical
    /// object may still have been updated; use `run_partitions` to inspect both.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        self.run_partitions().into_report()
    }

    /// validate/filter/encode both partitions, fit on train, then transform, project and
    /// publish each partition with the same fitted stats.
    pub fn run_partitions(&self) -> RunOutcome {
        init_tracing_once();
        if let Some(n) = self.opts.parallelism {
            if n > 0 {
                rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok();
            }
        }

        let started_at = now_rfc3339();
        let progress = ProgressScope::stages(self.opts.progress, "Preprocess", 2 * STAGES_PER_PARTITION + 1);

        let (train, test) = rayon::join(
            || self.prepare(Partition::Train, &progress),
            || self.prepare(Partition::Test, &progress),
        );

        // Blocking point: the fit must complete before any transform is issued.
        let (stats, train) = match train {
            Ok(prep) => match fit_train(&prep.rows) {
                Ok(stats) => (Some(stats), Ok(prep)),
                Err(e) => (None, Err(e)),
            },
            Err(e) => (None, Err(e)),
        };
        progress.done("fit");

        let finish = |prep: Result<Prepared, PipelineError>| match &stats {
            Some(stats) => prep.and_then(|p| self.complete(p, stats, &progress)),
            None => prep.and_then(|p| Err(PipelineError::FitUnavailable { partition: p.partition })),
        };
        let (train, test) = rayon::join(|| finish(train), || finish(test));

        for res in [&train, &test] {
            if let Err(e) = res {
                tracing::error!("{}", error_chain(e));
            }
        }
        progress.finish("done");

        RunOutcome { started_at, finished_at: now_rfc3339(), stats, train, test }
    }

    fn load(&self, partition: Partition) -> Result<RawTable, PipelineError> {
        let bucket = &self.opts.raw_bucket;
        let key = self.opts.raw_key(partition);
        let bytes = self.store.get(bucket, key).map_err(|e| PipelineError::storage("get", bucket, key, e))?;
        let table = read_delimited(partition, key, &bytes)?;
        tracing::info!("{}: loaded {} rows, {} columns from {}/{}", partition, table.len(), table.headers.len(), bucket, key);
        Ok(table)
    }

    fn prepare(&self, partition: Partition, progress: &ProgressScope) -> Result<Prepared, PipelineError> {
        let table = self.load(partition)?;
        progress.done("load");
        let layout = validate_schema(partition, &table)?;
        progress.done("validate");
        let kept = drop_incomplete(partition, &table, &layout)?;
        progress.done("filter");
        let rows = encode_sex(partition, kept);
        progress.done("encode");
        Ok(Prepared { partition, layout, rows_read: table.len(), rows })
    }

    fn complete(&self, prep: Prepared, stats: &NormalizationStats, progress: &ProgressScope) -> Result<PartitionReport, PipelineError> {
        let Prepared { partition, layout, rows_read, rows } = prep;
        let rows_kept = rows.len();

        let bucketed = apply_stats(partition, rows, stats)?;
        progress.done("transform");
        let table = project(&bucketed, layout.has_label());
        progress.done("project");

        let publisher = Publisher::new(
            self.store.as_ref(),
            self.tokens.as_ref(),
            &self.opts.processed_bucket,
            &self.opts.processed_prefix,
        );
        let published = publisher.publish(partition, &table, &self.opts.canonical_key(partition))?;
        progress.done("publish");

        Ok(PartitionReport { partition, rows_read, rows_kept, has_label: layout.has_label(), published })
    }
}
