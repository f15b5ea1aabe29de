mod config;
mod error;
mod util;
mod progress;

mod store;
mod local_store;

mod table;
mod schema;
mod filters;
mod encode;
mod normalize;
mod project;

mod shard;
mod publish;
mod pipeline;

pub use crate::config::{Partition, PrepOptions};
pub use crate::error::{error_chain, PipelineError, StorageError};
pub use crate::pipeline::{PartitionReport, Preprocessor, RunOutcome, RunReport};

// storage backends
pub use crate::store::{validate_key, MemoryObjectStore, ObjectStore};
pub use crate::local_store::LocalObjectStore;

// individual stages, usable on their own
pub use crate::table::{read_delimited, write_delimited, OutputTable, RawTable};
pub use crate::schema::{validate_schema, ColumnLayout, REQUIRED_COLUMNS};
pub use crate::filters::{drop_incomplete, Passenger};
pub use crate::encode::{encode_sex, indicator, EncodedPassenger};
pub use crate::normalize::{apply_stats, fit_train, BucketedRow, FieldRange, NormalizationStats};
pub use crate::project::{project, OUTPUT_COLUMNS};

// publication
pub use crate::shard::{is_data_object, shard_name, write_shards, SUCCESS_MARKER};
pub use crate::publish::{Published, Publisher, RandomTokens, TokenSource};

pub use crate::util::init_tracing_once;
