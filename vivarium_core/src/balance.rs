//! Daily water balance.
//!
//! Computes how much water a subject received on a day (split into
//! in-session rewards and out-of-session supplements), how much it should
//! receive, and the remaining/excess balance.

use crate::{classify, EventStore};
use chrono::{DateTime, Utc};

/// Least water a restricted subject may receive per day, in millilitres
pub const MIN_DAILY_WATER_ML: f64 = 0.5;
/// Most water the daily estimate may order, in millilitres
pub const MAX_DAILY_WATER_ML: f64 = 1.2;
/// Millilitres of water ordered per gram of weight deficit
pub const INTAKE_PER_GRAM_DEFICIT: f64 = 1.5;

/// Which administrations to count when summing a day's water
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionFilter {
    /// Every administration
    All,
    /// Only water earned during a session
    Reward,
    /// Only water given outside a session
    Supplement,
}

impl SessionFilter {
    fn matches(&self, is_reward: bool) -> bool {
        match self {
            SessionFilter::All => true,
            SessionFilter::Reward => is_reward,
            SessionFilter::Supplement => !is_reward,
        }
    }
}

/// Total water given on the calendar day of `date`, in millilitres,
/// counting only administrations selected by `filter`
pub fn given_water(store: &EventStore, date: DateTime<Utc>, filter: SessionFilter) -> f64 {
    let day = store.local_date(date);
    store
        .administrations()
        .iter()
        .filter(|a| store.local_date(a.at) == day)
        .filter(|a| filter.matches(a.is_reward()))
        .map(|a| a.millilitres)
        .sum()
}

/// Water earned during sessions on the day of `date`
pub fn given_water_reward(store: &EventStore, date: DateTime<Utc>) -> f64 {
    given_water(store, date, SessionFilter::Reward)
}

/// Water given outside sessions on the day of `date`
pub fn given_water_supplement(store: &EventStore, date: DateTime<Utc>) -> f64 {
    given_water(store, date, SessionFilter::Supplement)
}

/// All water given on the day of `date`
pub fn given_water_total(store: &EventStore, date: DateTime<Utc>) -> f64 {
    given_water(store, date, SessionFilter::All)
}

/// The water the subject should receive on the day of `date`.
///
/// Estimated from the gap between the target weight and the last known
/// weight, then clamped to the policy bounds so that one bad weighing can
/// never produce an unsafe or absurd order.
pub fn expected_water(store: &EventStore, date: DateTime<Utc>) -> f64 {
    let weight = store
        .last_weighing_before(date)
        .map_or(0.0, |w| w.grams);
    let expected_weight = classify::expected_weight(store, date);

    let estimate = (expected_weight - weight) * INTAKE_PER_GRAM_DEFICIT;
    estimate.clamp(MIN_DAILY_WATER_ML, MAX_DAILY_WATER_ML)
}

/// Water still owed on the day of `date` (negative when over-provisioned)
pub fn remaining_water(store: &EventStore, date: DateTime<Utc>) -> f64 {
    expected_water(store, date) - given_water_total(store, date)
}

/// Water given beyond the day's expectation (negative when still owed)
pub fn excess_water(store: &EventStore, date: DateTime<Utc>) -> f64 {
    -remaining_water(store, date)
}
