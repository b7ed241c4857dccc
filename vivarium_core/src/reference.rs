//! Reference weight resolution.
//!
//! The reference weight a welfare target is measured against can come from
//! three places. They are tried in a fixed priority order:
//!
//! 1. the explicit override set via `set_reference_weight`, once the query
//!    date reaches it;
//! 2. the active restriction period's recorded reference weight;
//! 3. if the period recorded no value, the last weighing taken before the
//!    period started.
//!
//! With no active period the reference is 0.0: no welfare target applies.
//! Resolution reads the store as-is on every call; nothing is cached.

use crate::{restriction, EventStore, ReferenceWeighing};
use chrono::{DateTime, Utc};

/// The reference weighing applicable at `date`, or None if no welfare
/// target applies
pub fn reference_weighing_at(store: &EventStore, date: DateTime<Utc>) -> Option<ReferenceWeighing> {
    resolve_override(store, date).or_else(|| resolve_period(store, date))
}

/// The reference weight in grams applicable at `date`; 0.0 means no
/// welfare target applies
pub fn reference_weight_at(store: &EventStore, date: DateTime<Utc>) -> f64 {
    reference_weighing_at(store, date).map_or(0.0, |r| r.grams)
}

fn resolve_override(store: &EventStore, date: DateTime<Utc>) -> Option<ReferenceWeighing> {
    store.reference_override().filter(|r| date >= r.at)
}

fn resolve_period(store: &EventStore, date: DateTime<Utc>) -> Option<ReferenceWeighing> {
    let period = restriction::active_period_at(store, date)?;
    match period.recorded_reference() {
        Some(grams) => Some(ReferenceWeighing {
            at: period.start,
            grams,
        }),
        // no value recorded when the restriction was opened: fall back to
        // the last weighing taken before the period start
        None => store
            .last_weighing_before(period.start)
            .map(|w| ReferenceWeighing {
                at: w.at,
                grams: w.grams,
            }),
    }
}
