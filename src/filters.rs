//! Null filter: keep only rows where every required field is present, parsing the
//! numeric ones on the way.

use crate::config::Partition;
use crate::error::PipelineError;
use crate::schema::{ColumnLayout, AGE, FARE, SURVIVED};
use crate::table::RawTable;

/// A row that passed the null filter.
#[derive(Clone, Debug, PartialEq)]
pub struct Passenger {
    pub sex: String,
    pub age: f64,
    pub fare: f64,
    pub embarked: String,
    pub survived: Option<f64>,
}

/// `line` is the 1-based data line (header excluded), for error messages.
fn parse_number(partition: Partition, line: u64, column: &'static str, raw: &str) -> Result<f64, PipelineError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PipelineError::InvalidValue { partition, line, column, value: raw.to_string() }),
    }
}

/// Drop every row where any of Age, Fare, Embarked or Sex is null. Order is preserved.
/// Fails with `EmptyPartition` when nothing survives.
pub fn drop_incomplete(partition: Partition, table: &RawTable, layout: &ColumnLayout) -> Result<Vec<Passenger>, PipelineError> {
    let mut kept = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let (Some(sex), Some(age), Some(fare), Some(embarked)) = (
            table.cell(row, layout.sex),
            table.cell(row, layout.age),
            table.cell(row, layout.fare),
            table.cell(row, layout.embarked),
        ) else {
            continue;
        };

        let line = row as u64 + 1;
        let survived = match layout.survived.and_then(|c| table.cell(row, c)) {
            Some(raw) => Some(parse_number(partition, line, SURVIVED, raw)?),
            None => None,
        };
        kept.push(Passenger {
            sex: sex.to_string(),
            age: parse_number(partition, line, AGE, age)?,
            fare: parse_number(partition, line, FARE, fare)?,
            embarked: embarked.to_string(),
            survived,
        });
    }

    let dropped = table.len() - kept.len();
    tracing::info!("{}: null filter kept {} of {} rows ({} dropped)", partition, kept.len(), table.len(), dropped);

    if kept.is_empty() {
        return Err(PipelineError::EmptyPartition { partition, stage: "null filter" });
    }
    Ok(kept)
}
