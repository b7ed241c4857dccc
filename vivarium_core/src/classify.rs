//! Weight status classification.
//!
//! Turns a reference weight, an implant weight and the configured tolerance
//! band into percentage-of-reference figures, expected weight ranges and the
//! three-level welfare status. Every query here is total: degenerate inputs
//! (reference at or below the implant weight) yield 0.0 rather than an
//! error, so welfare displays stay neutral instead of failing.

use crate::{reference, EventStore, WelfareStatus};
use chrono::{DateTime, Utc};

/// Fraction of the implant-adjusted reference weight below which the
/// restriction must stop, whatever the configured target percentage.
pub const SURVIVAL_FLOOR_FRACTION: f64 = 0.7;

/// A fraction of the implant-adjusted reference weight, re-expressed as an
/// absolute weight: `fraction * (weight - implant) + implant`
pub fn implant_adjusted(store: &EventStore, weight: f64, fraction: f64) -> f64 {
    let iw = store.profile().implant_weight;
    fraction * (weight - iw) + iw
}

/// Percentage of the last known weight relative to the reference weight,
/// implant excluded from both sides. 0.0 means the reference was not
/// available.
pub fn percentage_weight(store: &EventStore, date: DateTime<Utc>) -> f64 {
    let iw = store.profile().implant_weight;
    let w = store.weight(date);
    let e = reference::reference_weight_at(store, date);
    if e - iw > 0.0 {
        100.0 * (w - iw) / (e - iw)
    } else {
        0.0
    }
}

/// The target weight at `date`: the configured percentage of the reference
/// weight, or 0.0 when no target percentage is configured
pub fn expected_weight(store: &EventStore, date: DateTime<Utc>) -> f64 {
    let pct = store.profile().reference_weight_pct;
    if pct == 0.0 {
        return 0.0;
    }
    implant_adjusted(store, reference::reference_weight_at(store, date), pct)
}

/// The acceptable weight band at `date`: target percentage minus/plus the
/// z-score tolerance, both implant-adjusted. Returned as (min, max).
pub fn expected_weight_range(store: &EventStore, date: DateTime<Utc>) -> (f64, f64) {
    let profile = store.profile();
    let reference = reference::reference_weight_at(store, date);
    let min = implant_adjusted(
        store,
        reference,
        profile.reference_weight_pct - profile.zscore_weight_pct,
    );
    let max = implant_adjusted(
        store,
        reference,
        profile.reference_weight_pct + profile.zscore_weight_pct,
    );
    (min, max)
}

/// The survival-floor weight at `date`. Independent of the configured
/// target percentage.
pub fn min_weight(store: &EventStore, date: DateTime<Utc>) -> f64 {
    implant_adjusted(
        store,
        reference::reference_weight_at(store, date),
        SURVIVAL_FLOOR_FRACTION,
    )
}

/// Welfare status of the weighing taken on the calendar day of `date`.
///
/// Evaluated critical > warning > nominal: a missing or non-positive
/// weighing is undetermined (nominal, not flagged); below the survival
/// floor is critical; outside the expected band is a warning.
pub fn status(store: &EventStore, date: DateTime<Utc>) -> WelfareStatus {
    let w = match store.weighing_at(date) {
        Some(record) if record.grams > 0.0 => record.grams,
        _ => return WelfareStatus::Nominal,
    };

    if w < min_weight(store, date) {
        tracing::debug!(
            "Weight {w} breaches the survival floor for {}",
            store.profile().nickname
        );
        return WelfareStatus::Critical;
    }

    let (min, max) = expected_weight_range(store, date);
    if w < min || w > max {
        return WelfareStatus::Warning;
    }

    WelfareStatus::Nominal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sex, SubjectProfile};
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    /// Implant 2.0 g, target 80% of a 20.0 g reference, 5% tolerance
    fn implanted_store() -> EventStore {
        let mut profile = SubjectProfile::new("CSK-082", Sex::Male);
        profile.implant_weight = 2.0;
        profile.reference_weight_pct = 0.80;
        profile.zscore_weight_pct = 0.05;
        let mut store = EventStore::new(profile);
        store
            .add_restriction_period(ts(2024, 3, 1, 9), None, 20.0)
            .unwrap();
        store
    }

    #[test]
    fn test_min_weight_uses_survival_floor() {
        let store = implanted_store();
        // 0.7 * (20 - 2) + 2
        assert!((min_weight(&store, ts(2024, 3, 10, 12)) - 14.6).abs() < 1e-9);
    }

    #[test]
    fn test_status_critical_below_floor() {
        let mut store = implanted_store();
        store.add_weighing(ts(2024, 3, 10, 10), 14.0);
        assert_eq!(status(&store, ts(2024, 3, 10, 12)), WelfareStatus::Critical);
    }

    #[test]
    fn test_expected_range_and_nominal_status() {
        let mut store = implanted_store();
        store.add_weighing(ts(2024, 3, 10, 10), 17.0);

        let (min, max) = expected_weight_range(&store, ts(2024, 3, 10, 12));
        assert!((min - 15.5).abs() < 1e-9);
        assert!((max - 17.3).abs() < 1e-9);
        assert_eq!(status(&store, ts(2024, 3, 10, 12)), WelfareStatus::Nominal);
    }

    #[test]
    fn test_status_warning_outside_band() {
        // above the floor (14.6) but below the band minimum (15.5)
        let mut store = implanted_store();
        store.add_weighing(ts(2024, 3, 10, 10), 15.0);
        assert_eq!(status(&store, ts(2024, 3, 10, 12)), WelfareStatus::Warning);

        // heavier than the band maximum flags too
        let mut heavy = implanted_store();
        heavy.add_weighing(ts(2024, 3, 10, 10), 18.0);
        assert_eq!(status(&heavy, ts(2024, 3, 10, 12)), WelfareStatus::Warning);
    }

    #[test]
    fn test_status_undetermined_without_day_weighing() {
        let mut store = implanted_store();
        // a weighing exists, but not on the probed day
        store.add_weighing(ts(2024, 3, 8, 10), 14.0);
        assert_eq!(status(&store, ts(2024, 3, 10, 12)), WelfareStatus::Nominal);
    }

    #[test]
    fn test_percentage_weight() {
        let mut store = implanted_store();
        store.add_weighing(ts(2024, 3, 10, 10), 16.4);
        // 100 * (16.4 - 2) / (20 - 2)
        assert!((percentage_weight(&store, ts(2024, 3, 10, 12)) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_weight_defined_at_degenerate_reference() {
        // reference equal to the implant weight must not divide by zero
        let mut profile = SubjectProfile::new("CSK-083", Sex::Female);
        profile.implant_weight = 20.0;
        let mut store = EventStore::new(profile);
        store
            .add_restriction_period(ts(2024, 3, 1, 9), None, 20.0)
            .unwrap();
        store.add_weighing(ts(2024, 3, 10, 10), 21.0);

        assert_eq!(percentage_weight(&store, ts(2024, 3, 10, 12)), 0.0);
    }

    #[test]
    fn test_expected_weight_zero_without_target_pct() {
        let mut store = EventStore::new(SubjectProfile::new("CSK-084", Sex::Male));
        store
            .add_restriction_period(ts(2024, 3, 1, 9), None, 20.0)
            .unwrap();
        assert_eq!(expected_weight(&store, ts(2024, 3, 10, 12)), 0.0);
    }
}
