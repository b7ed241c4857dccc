//! Restriction period resolution.
//!
//! Answers "which restriction period applied at this date?" against the
//! store's ordered period list. Insert-side validation lives on
//! [`EventStore`](crate::EventStore); this module is read-only.

use crate::{EventStore, RestrictionPeriod};
use chrono::{DateTime, Utc};

/// The restriction period active at `date`, if any.
///
/// This is the latest period whose start falls on or before the calendar
/// date of `date` and whose end (if closed) has not yet passed. Periods do
/// not overlap, so at most one can match.
pub fn active_period_at(store: &EventStore, date: DateTime<Utc>) -> Option<&RestrictionPeriod> {
    let day = store.local_date(date);
    let period = store
        .restrictions()
        .iter()
        .rev()
        .find(|p| store.local_date(p.start) <= day)?;
    match period.end.closed_at() {
        Some(end) if date > end => None,
        _ => Some(period),
    }
}

/// Whether the subject was under water restriction at `date`
pub fn is_restricted_at(store: &EventStore, date: DateTime<Utc>) -> bool {
    active_period_at(store, date).is_some()
}

/// The currently open restriction period, if one exists. Only the
/// chronologically last period can be open.
pub fn current_open_period(store: &EventStore) -> Option<&RestrictionPeriod> {
    store.restrictions().last().filter(|p| p.end.is_open())
}

/// The effective end of a period for date arithmetic: its explicit end if
/// closed, otherwise `now`
pub fn effective_end(period: &RestrictionPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    period.end.effective(now)
}
