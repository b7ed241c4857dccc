//! Day-by-day welfare ledger.
//!
//! Walks a date range and assembles one fully derived [`DayRecord`] per
//! calendar day that has a weighing. Days without a weighing are skipped on
//! purpose: the ledger reports only days with a logged weight. The result is
//! a pure function of the stored events.

use crate::{balance, classify, reference, restriction, DayRecord, EventStore};
use chrono::NaiveDate;

/// Build the ledger for `[start, end]` inclusive.
///
/// `start` defaults to the earliest recorded date (first weighing or
/// administration, else birth date); `end` defaults to today on the
/// facility's wall clock. Returns an empty ledger when no start can be
/// determined.
pub fn build(
    store: &EventStore,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<DayRecord> {
    let Some(start) = start.or_else(|| store.first_date()) else {
        tracing::debug!(
            "No records and no birth date for {}; ledger is empty",
            store.profile().nickname
        );
        return Vec::new();
    };
    let end = end.unwrap_or_else(|| store.today());

    let mut rows = Vec::new();
    let mut day = start;
    while day <= end {
        // day-level queries are anchored at local noon
        let probe = store.noon(day);
        if let Some(weighing) = store.weighing_at(probe) {
            rows.push(DayRecord {
                date: day,
                weight: store.weight(probe),
                weighing_at: weighing.grams,
                reference_weight: reference::reference_weight_at(store, probe),
                expected_weight: classify::expected_weight(store, probe),
                min_weight: classify::min_weight(store, probe),
                percentage_weight: classify::percentage_weight(store, probe),
                given_water_reward: balance::given_water_reward(store, probe),
                given_water_supplement: balance::given_water_supplement(store, probe),
                given_water_total: balance::given_water_total(store, probe),
                expected_water: balance::expected_water(store, probe),
                excess_water: balance::excess_water(store, probe),
                is_water_restricted: restriction::is_restricted_at(store, probe),
            });
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    tracing::debug!(
        "Built ledger with {} rows for {} ({start} to {end})",
        rows.len(),
        store.profile().nickname
    );
    rows
}
