//! Final column selection.

use crate::encode::{SEX_FEMALE, SEX_MALE};
use crate::normalize::{BucketedRow, AGE_CATEGORY, FARE_CATEGORY};
use crate::schema::SURVIVED;
use crate::table::OutputTable;

/// Output column order; `Survived` is emitted only when the partition carries it.
pub const OUTPUT_COLUMNS: [&str; 5] = [SEX_FEMALE, SEX_MALE, AGE_CATEGORY, FARE_CATEGORY, SURVIVED];

/// Integral values print without a fractional part ("1", not "1.0").
fn render_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

pub fn project(rows: &[BucketedRow], has_label: bool) -> OutputTable {
    let columns: Vec<&'static str> = OUTPUT_COLUMNS
        .iter()
        .copied()
        .filter(|c| has_label || *c != SURVIVED)
        .collect();

    let rows = rows
        .iter()
        .map(|r| {
            let mut out = vec![
                r.sex_female.to_string(),
                r.sex_male.to_string(),
                r.age_category.to_string(),
                r.fare_category.to_string(),
            ];
            if has_label {
                out.push(r.survived.map(render_number).unwrap_or_default());
            }
            out
        })
        .collect();

    OutputTable { columns, rows }
}
