//! Growth-curve reference table.
//!
//! Maps (sex, age-in-weeks) to the population mean and standard deviation of
//! body weight. Used as a read-only collaborator when no subject-specific
//! reference weight is available; the engine only ever receives a borrowed
//! table, never loads one itself.

use crate::{Result, Sex};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::io::Read;

/// Population weight statistics for one (sex, age-week) cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowthPoint {
    /// Mean body weight in grams
    pub mean: f64,
    /// Standard deviation in grams
    pub std: f64,
}

/// Read-only growth-curve table for both sexes
#[derive(Clone, Debug)]
pub struct GrowthTable {
    male: BTreeMap<u32, GrowthPoint>,
    female: BTreeMap<u32, GrowthPoint>,
}

/// Built-in table, parsed once on first use
static DEFAULT_TABLE: Lazy<GrowthTable> = Lazy::new(|| {
    GrowthTable::from_csv(
        include_str!("../data/ref_weighings_male.csv").as_bytes(),
        include_str!("../data/ref_weighings_female.csv").as_bytes(),
    )
    .expect("built-in growth table is well-formed")
});

/// Get a reference to the built-in growth table.
///
/// Parsed once and reused; callers needing facility-specific curves can load
/// their own with [`GrowthTable::from_csv`] and pass that instead.
pub fn default_table() -> &'static GrowthTable {
    &DEFAULT_TABLE
}

impl GrowthTable {
    /// Load a table from two header-less CSV curves (`age_weeks,mean,std`),
    /// one per sex
    pub fn from_csv(male: impl Read, female: impl Read) -> Result<Self> {
        Ok(Self {
            male: read_curve(male)?,
            female: read_curve(female)?,
        })
    }

    /// The (mean, std) cell for a sex and age. Ages outside the table's
    /// range are clamped to its youngest/oldest entry; None only for an
    /// empty curve.
    pub fn lookup(&self, sex: Sex, age_weeks: u32) -> Option<GrowthPoint> {
        let curve = match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        };
        let (&youngest, _) = curve.first_key_value()?;
        let (&oldest, _) = curve.last_key_value()?;
        curve.get(&age_weeks.clamp(youngest, oldest)).copied()
    }
}

fn read_curve(reader: impl Read) -> Result<BTreeMap<u32, GrowthPoint>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);
    let mut curve = BTreeMap::new();
    for row in csv_reader.deserialize::<(u32, f64, f64)>() {
        let (age, mean, std) = row?;
        curve.insert(age, GrowthPoint { mean, std });
    }
    Ok(curve)
}

/// Age in whole weeks at `date`. Degrades to 0 with a warning when the
/// birth date is unknown, so lookups still resolve (to the youngest entry).
pub fn age_weeks(birth_date: Option<NaiveDate>, date: NaiveDate) -> u32 {
    let Some(birth) = birth_date else {
        tracing::warn!("No birth date specified; treating age as 0 weeks");
        return 0;
    };
    let days = (date - birth).num_days();
    if days < 0 {
        0
    } else {
        (days / 7) as u32
    }
}
