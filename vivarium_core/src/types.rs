//! Core domain types for the water-restriction welfare engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Subject profiles and their welfare parameters
//! - Weighing and water-administration records
//! - Restriction periods and their open/closed state
//! - Welfare status classification and per-day ledger rows

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Subject Types
// ============================================================================

/// Biological sex, as recorded by the husbandry system
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Parse the single-letter or spelled-out forms used in record files
    pub fn parse(s: &str) -> Option<Sex> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Some(Sex::Male),
            "f" | "female" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// Static description of a subject. Immutable after construction.
///
/// `implant_weight` is the mass of any head implant in grams; it is
/// subtracted from both sides of every weight comparison. The target and
/// z-score percentages are fractions of the reference weight (0.0 disables
/// the welfare target entirely).
#[derive(Clone, Debug)]
pub struct SubjectProfile {
    pub nickname: String,
    pub birth_date: Option<NaiveDate>,
    pub sex: Sex,
    pub implant_weight: f64,
    pub reference_weight_pct: f64,
    pub zscore_weight_pct: f64,
    /// Offset of the facility's wall clock from UTC; calendar-day grouping
    /// of records follows this offset.
    pub utc_offset: FixedOffset,
}

impl SubjectProfile {
    pub fn new(nickname: impl Into<String>, sex: Sex) -> Self {
        Self {
            nickname: nickname.into(),
            birth_date: None,
            sex,
            implant_weight: 0.0,
            reference_weight_pct: 0.0,
            zscore_weight_pct: 0.0,
            utc_offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }
}

// ============================================================================
// Event Records
// ============================================================================

/// A single body-weight measurement
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeighingRecord {
    pub at: DateTime<Utc>,
    /// Body weight in grams, implant included
    pub grams: f64,
}

/// A single water administration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct WaterAdministrationRecord {
    pub at: DateTime<Utc>,
    /// Volume in millilitres
    pub millilitres: f64,
    /// Experimental session this water was earned in, if any
    pub session: Option<Uuid>,
}

impl WaterAdministrationRecord {
    /// Water earned during a session counts as reward; the rest is a
    /// supplement given by the staff.
    pub fn is_reward(&self) -> bool {
        self.session.is_some()
    }
}

// ============================================================================
// Restriction Periods
// ============================================================================

/// End state of a restriction period
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PeriodEnd {
    /// The restriction is ongoing
    Open,
    /// The restriction ended at the given instant
    Closed { at: DateTime<Utc> },
}

impl PeriodEnd {
    pub fn is_open(&self) -> bool {
        matches!(self, PeriodEnd::Open)
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PeriodEnd::Open => None,
            PeriodEnd::Closed { at } => Some(*at),
        }
    }

    /// The effective end for date arithmetic: the explicit end if closed,
    /// otherwise the supplied "now".
    pub fn effective(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.closed_at().unwrap_or(now)
    }
}

/// An interval during which the subject's water intake is controlled
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestrictionPeriod {
    pub start: DateTime<Utc>,
    pub end: PeriodEnd,
    /// Reference weight recorded when the restriction was opened, in grams.
    /// 0.0 means no value was recorded.
    pub reference_weight: f64,
}

impl RestrictionPeriod {
    /// The recorded reference weight, if one was actually set
    pub fn recorded_reference(&self) -> Option<f64> {
        (self.reference_weight > 0.0).then_some(self.reference_weight)
    }
}

/// A reference weighing: the (instant, grams) pair welfare targets are
/// measured against
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceWeighing {
    pub at: DateTime<Utc>,
    pub grams: f64,
}

// ============================================================================
// Classification Types
// ============================================================================

/// Rendering style for a threshold band
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStyle {
    Solid,
    Dashed,
}

/// A display band at a fraction of the reference weight
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Threshold {
    /// Fraction of the implant-adjusted reference weight, in [0, 1]
    pub fraction: f64,
    pub style: ThresholdStyle,
}

/// Three-level welfare classification of a subject's weight
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WelfareStatus {
    /// Weight within the expected range, or no weight recorded that day
    Nominal,
    /// Weight outside the expected range
    Warning,
    /// Weight below the survival floor
    Critical,
}

impl WelfareStatus {
    /// Numeric code used by record exports: 0 nominal, 1 warning, 2 critical
    pub fn code(&self) -> u8 {
        match self {
            WelfareStatus::Nominal => 0,
            WelfareStatus::Warning => 1,
            WelfareStatus::Critical => 2,
        }
    }
}

impl std::fmt::Display for WelfareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WelfareStatus::Nominal => "nominal",
            WelfareStatus::Warning => "warning",
            WelfareStatus::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Ledger Rows
// ============================================================================

/// One fully derived day of the welfare ledger.
///
/// Field names double as the column names of exported reports. `weight` is
/// the last known weight at the date; `weighing_at` is the measurement taken
/// on the date itself (a row only exists for days that have one).
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub weight: f64,
    pub weighing_at: f64,
    pub reference_weight: f64,
    pub expected_weight: f64,
    pub min_weight: f64,
    pub percentage_weight: f64,
    pub given_water_reward: f64,
    pub given_water_supplement: f64,
    pub given_water_total: f64,
    pub expected_water: f64,
    pub excess_water: f64,
    pub is_water_restricted: bool,
}
