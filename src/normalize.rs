//! Range normalizer: min/max fitted on train, then applied unchanged to every partition.
//!
//! The bucket for a value `x` in a field with fitted range `[min, max]` is
//! `round((x - min) / (max - min) * 2)`, rounding half away from zero (`f64::round`):
//! 0.5 -> 1, 1.5 -> 2, -0.5 -> -1. Train values always land in {0, 1, 2}; values from
//! other partitions outside `[min, max]` produce codes outside that set and are kept.

use crate::config::Partition;
use crate::encode::EncodedPassenger;
use crate::error::PipelineError;
use crate::schema::{AGE, FARE};
use rayon::prelude::*;
use serde::Serialize;

pub const AGE_CATEGORY: &str = "Age_Category";
pub const FARE_CATEGORY: &str = "Fare_Category";

/// Number of category levels minus one.
const BUCKET_SPAN: f64 = 2.0;

/// Fitted `[min, max]` of one numeric field. Only constructed with `max > min`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
}

impl FieldRange {
    fn fit(field: &'static str, values: impl Iterator<Item = f64>) -> Result<Self, PipelineError> {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !min.is_finite() || !max.is_finite() {
            return Err(PipelineError::EmptyPartition { partition: Partition::Train, stage: "fit" });
        }
        if !(max > min) {
            return Err(PipelineError::DegenerateRange { partition: Partition::Train, field, value: min });
        }
        if !(max - min).is_finite() {
            return Err(PipelineError::UnrepresentableRange { partition: Partition::Train, field, min, max });
        }
        Ok(Self { min, max })
    }

    /// Bucket code for `x`, or `None` when the scaled value is not finite or does not
    /// fit in an `i64`.
    #[inline]
    pub fn category(&self, x: f64) -> Option<i64> {
        let code = (((x - self.min) / (self.max - self.min)) * BUCKET_SPAN).round();
        // i64::MIN as f64 is exact (-2^63); 2^63 itself is out of range.
        (code.is_finite() && code >= i64::MIN as f64 && code < -(i64::MIN as f64)).then(|| code as i64)
    }
}

/// Parameters fitted once on the filtered train partition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizationStats {
    pub age: FieldRange,
    pub fare: FieldRange,
}

/// Compute min/max of Age and Fare over the (already filtered) train rows.
pub fn fit_train(rows: &[EncodedPassenger]) -> Result<NormalizationStats, PipelineError> {
    let stats = NormalizationStats {
        age: FieldRange::fit(AGE, rows.iter().map(|r| r.passenger.age))?,
        fare: FieldRange::fit(FARE, rows.iter().map(|r| r.passenger.fare))?,
    };
    tracing::info!(
        "fitted on {} train rows: Age [{}, {}], Fare [{}, {}]",
        rows.len(), stats.age.min, stats.age.max, stats.fare.min, stats.fare.max
    );
    Ok(stats)
}

#[derive(Clone, Debug, PartialEq)]
pub struct BucketedRow {
    pub sex_female: u8,
    pub sex_male: u8,
    pub age_category: i64,
    pub fare_category: i64,
    pub survived: Option<f64>,
}

fn bucket(partition: Partition, field: &'static str, range: &FieldRange, x: f64) -> Result<i64, PipelineError> {
    range
        .category(x)
        .ok_or(PipelineError::CategoryOverflow { partition, field, value: x })
}

/// Bucket Age and Fare with the given stats. Row order is preserved.
pub fn apply_stats(
    partition: Partition,
    rows: Vec<EncodedPassenger>,
    stats: &NormalizationStats,
) -> Result<Vec<BucketedRow>, PipelineError> {
    let out: Vec<BucketedRow> = rows
        .into_par_iter()
        .map(|r| {
            Ok(BucketedRow {
                sex_female: r.sex_female,
                sex_male: r.sex_male,
                age_category: bucket(partition, AGE, &stats.age, r.passenger.age)?,
                fare_category: bucket(partition, FARE, &stats.fare, r.passenger.fare)?,
                survived: r.passenger.survived,
            })
        })
        .collect::<Result<_, PipelineError>>()?;

    let outside = out
        .iter()
        .filter(|r| !(0..=2).contains(&r.age_category) || !(0..=2).contains(&r.fare_category))
        .count();
    if outside > 0 {
        tracing::info!("{}: {} row(s) fall outside the fitted range (categories kept unclamped)", partition, outside);
    }
    Ok(out)
}
