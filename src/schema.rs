//! Required-column check, run before any row is touched.

use crate::config::Partition;
use crate::error::PipelineError;
use crate::table::RawTable;

pub const SEX: &str = "Sex";
pub const AGE: &str = "Age";
pub const FARE: &str = "Fare";
pub const EMBARKED: &str = "Embarked";
pub const SURVIVED: &str = "Survived";

/// Columns that must be present and non-null for a row to be processed.
pub const REQUIRED_COLUMNS: [&str; 4] = [AGE, FARE, EMBARKED, SEX];

/// Resolved positions of the columns the pipeline reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    pub sex: usize,
    pub age: usize,
    pub fare: usize,
    pub embarked: usize,
    pub survived: Option<usize>,
}

impl ColumnLayout {
    pub fn has_label(&self) -> bool {
        self.survived.is_some()
    }
}

/// Succeeds iff every required column exists; reports all missing columns at once.
pub fn validate_schema(partition: Partition, table: &RawTable) -> Result<ColumnLayout, PipelineError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::SchemaMismatch { partition, missing });
    }

    let idx = |name: &str| table.column_index(name).unwrap_or_default();
    let layout = ColumnLayout {
        sex: idx(SEX),
        age: idx(AGE),
        fare: idx(FARE),
        embarked: idx(EMBARKED),
        survived: table.column_index(SURVIVED),
    };

    if partition == Partition::Train && !layout.has_label() {
        tracing::warn!("{}: no {} column; output will carry features only", partition, SURVIVED);
    }
    Ok(layout)
}
