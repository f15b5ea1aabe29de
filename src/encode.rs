//! Indicator columns for `Sex`.
//!
//! `Sex_Female` and `Sex_Male` are computed independently with exact, case-sensitive
//! matches. A value that is neither "female" nor "male" (e.g. "Male", "unknown")
//! therefore gets 0 in both columns. That row is kept as its own category.

use crate::config::Partition;
use crate::filters::Passenger;

pub const SEX_FEMALE: &str = "Sex_Female";
pub const SEX_MALE: &str = "Sex_Male";

#[derive(Clone, Debug, PartialEq)]
pub struct EncodedPassenger {
    pub passenger: Passenger,
    pub sex_female: u8,
    pub sex_male: u8,
}

#[inline]
pub fn indicator(value: &str, category: &str) -> u8 {
    u8::from(value == category)
}

pub fn encode_sex(partition: Partition, rows: Vec<Passenger>) -> Vec<EncodedPassenger> {
    let encoded: Vec<EncodedPassenger> = rows
        .into_iter()
        .map(|p| EncodedPassenger {
            sex_female: indicator(&p.sex, "female"),
            sex_male: indicator(&p.sex, "male"),
            passenger: p,
        })
        .collect();

    let unmatched = encoded.iter().filter(|e| e.sex_female == 0 && e.sex_male == 0).count();
    if unmatched > 0 {
        tracing::warn!("{}: {} row(s) with Sex neither \"female\" nor \"male\"; both indicators are 0", partition, unmatched);
    }
    encoded
}
