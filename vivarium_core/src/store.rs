//! Per-subject event store.
//!
//! Holds the immutable subject profile plus the three event collections the
//! derivations run over: weighings, water administrations and restriction
//! periods. Appends keep the collections sorted ascending by timestamp, and
//! restriction inserts re-validate the ordering / single-open-period
//! invariants on every call. There is no delete: corrections are made by
//! rebuilding the store from amended records.

use crate::{
    Error, PeriodEnd, ReferenceWeighing, RestrictionPeriod, Result, SubjectProfile, Threshold,
    WaterAdministrationRecord, WeighingRecord,
};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

/// All recorded events for one subject, ready for derivation queries
#[derive(Clone, Debug)]
pub struct EventStore {
    profile: SubjectProfile,
    weighings: Vec<WeighingRecord>,
    administrations: Vec<WaterAdministrationRecord>,
    restrictions: Vec<RestrictionPeriod>,
    reference_override: Option<ReferenceWeighing>,
    thresholds: Vec<Threshold>,
}

impl EventStore {
    pub fn new(profile: SubjectProfile) -> Self {
        Self {
            profile,
            weighings: Vec::new(),
            administrations: Vec::new(),
            restrictions: Vec::new(),
            reference_override: None,
            thresholds: Vec::new(),
        }
    }

    pub fn profile(&self) -> &SubjectProfile {
        &self.profile
    }

    pub fn weighings(&self) -> &[WeighingRecord] {
        &self.weighings
    }

    pub fn administrations(&self) -> &[WaterAdministrationRecord] {
        &self.administrations
    }

    pub fn restrictions(&self) -> &[RestrictionPeriod] {
        &self.restrictions
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn reference_override(&self) -> Option<ReferenceWeighing> {
        self.reference_override
    }

    // ========================================================================
    // Append operations
    // ========================================================================

    /// Record a weighing, keeping the collection sorted by timestamp
    pub fn add_weighing(&mut self, at: DateTime<Utc>, grams: f64) {
        let record = WeighingRecord { at, grams };
        let pos = self.weighings.partition_point(|w| w.at <= at);
        self.weighings.insert(pos, record);
    }

    /// Record a water administration, keeping the collection sorted by
    /// timestamp. A session id marks the water as an in-session reward.
    pub fn add_water_administration(
        &mut self,
        at: DateTime<Utc>,
        millilitres: f64,
        session: Option<Uuid>,
    ) {
        let record = WaterAdministrationRecord {
            at,
            millilitres,
            session,
        };
        let pos = self.administrations.partition_point(|a| a.at <= at);
        self.administrations.insert(pos, record);
    }

    /// Open a new restriction period, closed or still open.
    ///
    /// Rejects the insert (store unchanged) if the start precedes the
    /// previous period's start, if a period is still open, or if the end
    /// precedes the start.
    pub fn add_restriction_period(
        &mut self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        reference_weight: f64,
    ) -> Result<()> {
        if let Some(previous) = self.restrictions.last() {
            if previous.end.is_open() {
                return Err(Error::RestrictionAlreadyOpen {
                    start: previous.start,
                });
            }
            if start < previous.start {
                return Err(Error::UnorderedRestriction {
                    start,
                    previous: previous.start,
                });
            }
        }
        if let Some(end) = end {
            if end < start {
                return Err(Error::InvalidDate(format!(
                    "restriction end {end} precedes its start {start}"
                )));
            }
        }

        let end = match end {
            Some(at) => PeriodEnd::Closed { at },
            None => PeriodEnd::Open,
        };
        self.restrictions.push(RestrictionPeriod {
            start,
            end,
            reference_weight,
        });
        tracing::debug!(
            "Added restriction period for {} starting {}",
            self.profile.nickname,
            start
        );
        Ok(())
    }

    /// Close the currently open restriction period at the given instant
    pub fn close_restriction(&mut self, at: DateTime<Utc>) -> Result<()> {
        let last = match self.restrictions.last_mut() {
            Some(period) if period.end.is_open() => period,
            _ => return Err(Error::NoOpenRestriction),
        };
        if at < last.start {
            return Err(Error::InvalidDate(format!(
                "restriction end {at} precedes its start {}",
                last.start
            )));
        }
        last.end = PeriodEnd::Closed { at };
        tracing::debug!(
            "Closed restriction period for {} at {}",
            self.profile.nickname,
            at
        );
        Ok(())
    }

    /// Set the explicit reference weight override
    pub fn set_reference_weight(&mut self, at: DateTime<Utc>, grams: f64) {
        self.reference_override = Some(ReferenceWeighing { at, grams });
    }

    /// Add a display threshold band; bands are kept sorted ascending by
    /// fraction
    pub fn add_threshold(&mut self, threshold: Threshold) {
        self.thresholds.push(threshold);
        self.thresholds.sort_by(|a, b| {
            a.fraction
                .partial_cmp(&b.fraction)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    // ========================================================================
    // Date helpers
    // ========================================================================

    /// The calendar date of an instant on the facility's wall clock
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.profile.utc_offset).date_naive()
    }

    /// Today's calendar date on the facility's wall clock
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    /// Noon of a local calendar date, as a UTC instant. Day-level queries
    /// are anchored at local noon so they land inside the day regardless of
    /// the offset.
    pub fn noon(&self, date: NaiveDate) -> DateTime<Utc> {
        let offset = self.profile.utc_offset;
        let naive = date.and_hms_opt(12, 0, 0).expect("noon is a valid time of day");
        match offset.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            // a fixed offset never yields ambiguous or missing local times
            _ => Utc.from_utc_datetime(
                &(naive - Duration::seconds(i64::from(offset.local_minus_utc()))),
            ),
        }
    }

    // ========================================================================
    // Event queries
    // ========================================================================

    /// The weighing taken on the same calendar date as `date`, if any.
    /// Takes the first match; per-day uniqueness is expected but not
    /// enforced.
    pub fn weighing_at(&self, date: DateTime<Utc>) -> Option<&WeighingRecord> {
        let day = self.local_date(date);
        self.weighings.iter().find(|w| self.local_date(w.at) == day)
    }

    /// The last weighing taken on or before the calendar date of `date`
    pub fn last_weighing_before(&self, date: DateTime<Utc>) -> Option<&WeighingRecord> {
        let day = self.local_date(date);
        self.weighings
            .iter()
            .rev()
            .find(|w| self.local_date(w.at) <= day)
    }

    /// The last known weight at `date`, or 0.0 if the subject has never
    /// been weighed by then
    pub fn weight(&self, date: DateTime<Utc>) -> f64 {
        self.last_weighing_before(date).map_or(0.0, |w| w.grams)
    }

    /// The last water administration at or before the instant `date`
    pub fn last_administration_before(
        &self,
        date: DateTime<Utc>,
    ) -> Option<&WaterAdministrationRecord> {
        self.administrations.iter().rev().find(|a| a.at <= date)
    }

    /// The earliest date any record exists for: first weighing or first
    /// administration, falling back to the birth date
    pub fn first_date(&self) -> Option<NaiveDate> {
        let first_weighing = self.weighings.first().map(|w| self.local_date(w.at));
        let first_administration = self
            .administrations
            .first()
            .map(|a| self.local_date(a.at));
        match (first_weighing, first_administration) {
            (Some(w), Some(a)) => Some(w.min(a)),
            (Some(d), None) | (None, Some(d)) => Some(d),
            (None, None) => self.profile.birth_date,
        }
    }
}
