//! Scheduler facade over one snapshot of resources and bookings.

use chrono::{Days, Duration, NaiveDateTime};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::models::{
    Booking, BookingShift, ChainJob, ChainPlacement, ConflictingBooking, Interval, Placement,
    Resource, ScheduleRequest,
};
use crate::utilization::{summarize, ResourceUtilization};
use crate::{log_changes, log_checks};

use super::cascade::shift_following;
use super::chain::schedule_chain;
use super::conflict::check_no_overlap;
use super::slot_finder::SlotFinder;
use super::timeline::Timeline;

/// Errors that can occur during scheduling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Malformed booking {id}: end {end} is not after start {start}")]
    MalformedBooking {
        id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("Invalid interval: end {end} is not after start {start}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("Cannot schedule: earliest slot {proposed} ends after deadline {deadline}")]
    DeadlineExceeded {
        proposed: Interval,
        deadline: NaiveDateTime,
    },
    #[error(
        "Scheduling conflict: overlaps with {} on {resource_id}",
        join_conflicts(.conflicts)
    )]
    OverlapConflict {
        resource_id: String,
        conflicts: Vec<ConflictingBooking>,
    },
    #[error("No slot available for {job_id}: earliest end {earliest_end} is after deadline {deadline}")]
    NoSlotAvailable {
        job_id: String,
        deadline: NaiveDateTime,
        earliest_end: NaiveDateTime,
    },
    #[error("Resource not found: {0}")]
    UnknownResource(String),
    #[error("Booking not found: {0}")]
    UnknownBooking(String),
    #[error("Invalid duration: {0}")]
    InvalidDuration(Duration),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown fit strategy: {0}")]
    UnknownStrategy(String),
    #[error("Time arithmetic overflow")]
    TimeOverflow,
}

impl SchedulerError {
    pub(crate) fn malformed(booking: &Booking) -> Self {
        Self::MalformedBooking {
            id: booking.id.clone(),
            start: booking.start,
            end: booking.end,
        }
    }
}

fn join_conflicts(conflicts: &[ConflictingBooking]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stateless engine bound to one snapshot of the caller's store.
///
/// Built per request from the records the host just read, used for one or
/// more pure computations, then dropped. Nothing is written back: every
/// operation returns the proposed changes for the host to persist
/// atomically. Two schedulers built from stale snapshots of the same resource
/// can pick the same gap; the host serializes writes per resource and re-runs
/// on conflict.
pub struct Scheduler {
    config: EngineConfig,
    finder: SlotFinder,
    resources: FxHashMap<String, Resource>,
    /// Bookings grouped by resource id, in input order
    bookings: FxHashMap<String, Vec<Booking>>,
}

impl Scheduler {
    /// Create a scheduler over `resources` and their `bookings`.
    ///
    /// Fails on an unknown fit strategy or a malformed booking. Bookings on
    /// resources missing from `resources` are kept but never reachable: only
    /// a request naming such a resource fails, with `UnknownResource`.
    pub fn new(
        resources: Vec<Resource>,
        bookings: Vec<Booking>,
        config: EngineConfig,
    ) -> Result<Self, SchedulerError> {
        let finder = SlotFinder::from_config(&config)?;

        let resources: FxHashMap<String, Resource> =
            resources.into_iter().map(|r| (r.id.clone(), r)).collect();

        let mut grouped: FxHashMap<String, Vec<Booking>> = FxHashMap::default();
        for booking in bookings {
            if !booking.is_well_formed() {
                return Err(SchedulerError::malformed(&booking));
            }
            grouped
                .entry(booking.resource_id.clone())
                .or_default()
                .push(booking);
        }

        Ok(Self {
            config,
            finder,
            resources,
            bookings: grouped,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.get(resource_id)
    }

    /// Build the timeline of `resource_id`, optionally leaving out one chain.
    pub fn timeline(
        &self,
        resource_id: &str,
        exclude_chain: Option<&str>,
    ) -> Result<Timeline, SchedulerError> {
        if !self.resources.contains_key(resource_id) {
            return Err(SchedulerError::UnknownResource(resource_id.to_string()));
        }
        let bookings = self
            .bookings
            .get(resource_id)
            .map(|v| v.as_slice())
            .unwrap_or_default()
            .iter()
            .cloned();
        match exclude_chain {
            Some(chain_id) => Timeline::load_excluding_chain(resource_id, bookings, chain_id),
            None => Timeline::load(resource_id, bookings),
        }
    }

    fn find_booking(&self, booking_id: &str) -> Result<&Booking, SchedulerError> {
        self.bookings
            .values()
            .flatten()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| SchedulerError::UnknownBooking(booking_id.to_string()))
    }

    /// Place a new booking on the best of the request's candidate resources.
    ///
    /// Each candidate is searched independently; the placement that ends
    /// earliest wins and the first candidate keeps ties. Only when every
    /// candidate misses its deadline is `DeadlineExceeded` returned, for the
    /// candidate whose proposal ends earliest.
    pub fn schedule_request(&self, request: &ScheduleRequest) -> Result<Placement, SchedulerError> {
        if request.resource_ids.is_empty() {
            return Err(SchedulerError::InvalidRequest(
                "no candidate resources".to_string(),
            ));
        }
        let verbosity = self.config.verbosity;
        let duration = request.duration.unwrap_or(self.finder.default_duration);
        let deadline = match (request.deadline, self.config.default_deadline_days) {
            (Some(deadline), _) => Some(deadline),
            (None, Some(days)) => Some(
                request
                    .earliest_start
                    .checked_add_days(Days::new(days.max(0) as u64))
                    .ok_or(SchedulerError::TimeOverflow)?,
            ),
            (None, None) => None,
        };

        let mut best: Option<Placement> = None;
        let mut best_miss: Option<(Interval, NaiveDateTime)> = None;

        for resource_id in &request.resource_ids {
            let timeline = self.timeline(resource_id, None)?;
            match self
                .finder
                .find(&timeline, duration, request.earliest_start, deadline)
            {
                Ok(interval) => {
                    log_checks!(verbosity, "  Candidate {} offers {}", resource_id, interval);
                    if best.as_ref().map_or(true, |b| interval.end < b.interval.end) {
                        best = Some(Placement {
                            resource_id: resource_id.clone(),
                            interval,
                        });
                    }
                }
                Err(SchedulerError::DeadlineExceeded { proposed, deadline }) => {
                    if best_miss.map_or(true, |(p, _)| proposed.end < p.end) {
                        best_miss = Some((proposed, deadline));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        match (best, best_miss) {
            (Some(placement), _) => {
                log_changes!(
                    verbosity,
                    "Scheduled request on {} at {}",
                    placement.resource_id,
                    placement.interval
                );
                Ok(placement)
            }
            (None, Some((proposed, deadline))) => {
                Err(SchedulerError::DeadlineExceeded { proposed, deadline })
            }
            // Not reachable with a non-empty candidate list
            (None, None) => Err(SchedulerError::InvalidRequest(
                "no candidate produced a slot".to_string(),
            )),
        }
    }

    /// Validate a manual move of `booking_id` to `candidate`.
    ///
    /// Checks against `new_resource` when given, otherwise the booking's own
    /// resource. The moved booking itself is excluded from the comparison.
    pub fn validate_edit(
        &self,
        booking_id: &str,
        candidate: Interval,
        new_resource: Option<&str>,
    ) -> Result<(), SchedulerError> {
        let booking = self.find_booking(booking_id)?;
        let resource_id = new_resource.unwrap_or(&booking.resource_id);
        let timeline = self.timeline(resource_id, None)?;
        let result = check_no_overlap(&timeline, &candidate, Some(booking_id));
        if let Err(SchedulerError::OverlapConflict { conflicts, .. }) = &result {
            log_changes!(
                self.config.verbosity,
                "Rejected move of {} to {} on {}: {} conflicts",
                booking_id,
                candidate,
                resource_id,
                conflicts.len()
            );
        }
        result
    }

    /// Propagate the move of `booking_id` to `new_interval` along its resource.
    pub fn cascade(
        &self,
        booking_id: &str,
        new_interval: Interval,
    ) -> Result<Vec<BookingShift>, SchedulerError> {
        let booking = self.find_booking(booking_id)?;
        let timeline = self.timeline(&booking.resource_id, None)?;
        let shifts = shift_following(&timeline, booking_id, new_interval, self.config.verbosity)?;
        log_changes!(
            self.config.verbosity,
            "Cascade from {} proposes {} shifts",
            booking_id,
            shifts.len()
        );
        Ok(shifts)
    }

    /// Schedule a chain of jobs back-to-back from `anchor`.
    ///
    /// Existing bookings of `chain_id` are left out of every timeline since
    /// the chain is being recomputed.
    pub fn schedule_chain(
        &self,
        chain_id: Option<&str>,
        jobs: &[ChainJob],
        anchor: NaiveDateTime,
        deadline: Option<NaiveDateTime>,
    ) -> Result<Vec<ChainPlacement>, SchedulerError> {
        let placements = schedule_chain(&self.finder, jobs, anchor, deadline, |resource_id| {
            self.timeline(resource_id, chain_id)
        })?;
        log_changes!(
            self.config.verbosity,
            "Scheduled chain {} with {} jobs",
            chain_id.unwrap_or("-"),
            placements.len()
        );
        Ok(placements)
    }

    /// Per-resource utilization for bookings lying entirely inside `window`.
    pub fn utilization(&self, window: Interval) -> Vec<ResourceUtilization> {
        let known = self
            .bookings
            .iter()
            .filter(|(resource_id, _)| self.resources.contains_key(*resource_id))
            .flat_map(|(_, bookings)| bookings);
        summarize(
            known,
            |resource_id| {
                self.resources
                    .get(resource_id)
                    .and_then(|r| r.resource_type.clone())
            },
            window,
        )
    }
}
