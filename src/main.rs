use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use titanic_etl::{error_chain, init_tracing_once, LocalObjectStore, PrepOptions, Preprocessor};

const STORAGE_ROOT: &str = "./storage";

fn main() -> Result<()> {
    init_tracing_once();

    let root = std::env::var("PREP_STORAGE_ROOT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(STORAGE_ROOT));
    let opts = PrepOptions::default().merge_env().with_progress(true);

    tracing::info!(
        "raw {}/{{{},{}}} -> processed {}/{} (storage root {})",
        opts.raw_bucket, opts.train_key, opts.test_key, opts.processed_bucket, opts.processed_prefix, root.display()
    );

    let store = Arc::new(LocalObjectStore::new(&root));
    let outcome = Preprocessor::new(store).options(opts).run_partitions();

    for res in [&outcome.train, &outcome.test] {
        match res {
            Ok(r) => println!("{}: {} of {} rows -> {}/{}", r.partition, r.rows_kept, r.rows_read, r.published.bucket, r.published.canonical_key),
            Err(e) => eprintln!("error: {}", error_chain(e)),
        }
    }

    let report = outcome.into_report().context("preprocessing failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
