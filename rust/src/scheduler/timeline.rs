//! Per-resource timeline of bookings sorted by start.

use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::models::{Booking, BookingStatus, Interval};

use super::core::SchedulerError;

/// Sorted view of one resource's active bookings.
///
/// Built fresh from the caller's snapshot for each operation. Cancelled
/// bookings never enter the timeline; completed ones stay as obstacles.
/// Bookings are ordered by start, ties broken by id so that every operation
/// over a fixed snapshot is deterministic.
#[derive(Clone, Debug)]
pub struct Timeline {
    /// Resource this timeline belongs to
    pub resource_id: String,
    /// Invariant: sorted by (start, id), every booking has start < end
    bookings: Vec<Booking>,
}

/// A free interval on a timeline. `None` bounds are unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gap {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Gap {
    /// The open-ended gap after the last booking.
    pub fn is_tail(&self) -> bool {
        self.end.is_none()
    }

    /// Start of the usable window once clipped to `earliest`.
    pub fn window_start(&self, earliest: NaiveDateTime) -> NaiveDateTime {
        self.start.map_or(earliest, |s| s.max(earliest))
    }
}

impl Timeline {
    /// Build a timeline from an unordered booking list.
    ///
    /// Fails on the first booking with `end <= start`, cancelled or not.
    pub fn load<I>(resource_id: impl Into<String>, bookings: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = Booking>,
    {
        Self::load_filtered(resource_id.into(), bookings, |_| true)
    }

    /// Like [`Timeline::load`], leaving out bookings that belong to `chain_id`.
    pub fn load_excluding_chain<I>(
        resource_id: impl Into<String>,
        bookings: I,
        chain_id: &str,
    ) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = Booking>,
    {
        Self::load_filtered(resource_id.into(), bookings, |b| {
            b.chain_id.as_deref() != Some(chain_id)
        })
    }

    fn load_filtered<I, F>(resource_id: String, bookings: I, keep: F) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = Booking>,
        F: Fn(&Booking) -> bool,
    {
        let mut kept = Vec::new();
        for booking in bookings {
            if !booking.is_well_formed() {
                return Err(SchedulerError::malformed(&booking));
            }
            if booking.status == BookingStatus::Cancelled || !keep(&booking) {
                continue;
            }
            kept.push(booking);
        }
        kept.sort_by(chronological);

        Ok(Self {
            resource_id,
            bookings: kept,
        })
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn get(&self, booking_id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == booking_id)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Insert a booking at its sorted position.
    pub fn insert(&mut self, booking: Booking) -> Result<(), SchedulerError> {
        if !booking.is_well_formed() {
            return Err(SchedulerError::malformed(&booking));
        }
        if booking.status == BookingStatus::Cancelled {
            return Ok(());
        }
        let idx = self
            .bookings
            .partition_point(|b| chronological(b, &booking) == Ordering::Less);
        self.bookings.insert(idx, booking);
        Ok(())
    }

    /// Remove a booking by id, returning it if present.
    pub fn remove(&mut self, booking_id: &str) -> Option<Booking> {
        let idx = self.bookings.iter().position(|b| b.id == booking_id)?;
        Some(self.bookings.remove(idx))
    }

    /// Bookings overlapping `interval` (half-open), in timeline order.
    pub fn overlapping<'a>(&'a self, interval: &'a Interval) -> impl Iterator<Item = &'a Booking> {
        // Only bookings starting before the interval ends can overlap it
        let upper = self.bookings.partition_point(|b| b.start < interval.end);
        self.bookings[..upper]
            .iter()
            .filter(move |b| b.end > interval.start)
    }

    /// Free intervals in chronological order, ending with the open tail.
    ///
    /// Zero-length gaps between back-to-back bookings are omitted. Calling
    /// this again restarts the sequence.
    pub fn gaps(&self) -> Gaps<'_> {
        Gaps {
            bookings: &self.bookings,
            next: 0,
            frontier: None,
            finished: false,
        }
    }

    /// Gaps that still have room at or after `earliest`, clipped to it.
    pub fn gaps_after(&self, earliest: NaiveDateTime) -> impl Iterator<Item = Gap> + '_ {
        self.gaps()
            .filter(move |g| g.end.map_or(true, |e| e > earliest))
            .map(move |g| Gap {
                start: Some(g.window_start(earliest)),
                end: g.end,
            })
    }
}

/// Timeline ordering: start ascending, then id.
fn chronological(a: &Booking, b: &Booking) -> Ordering {
    a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id))
}

/// Lazy gap iterator over a timeline. See [`Timeline::gaps`].
#[derive(Clone, Debug)]
pub struct Gaps<'a> {
    bookings: &'a [Booking],
    next: usize,
    /// Latest end seen so far; `None` before the first booking
    frontier: Option<NaiveDateTime>,
    finished: bool,
}

impl Iterator for Gaps<'_> {
    type Item = Gap;

    fn next(&mut self) -> Option<Gap> {
        while let Some(booking) = self.bookings.get(self.next) {
            self.next += 1;
            let gap = match self.frontier {
                None => Some(Gap {
                    start: None,
                    end: Some(booking.start),
                }),
                Some(frontier) if frontier < booking.start => Some(Gap {
                    start: Some(frontier),
                    end: Some(booking.start),
                }),
                Some(_) => None,
            };
            // Running max so that overlapping input never yields a bogus gap
            self.frontier = Some(self.frontier.map_or(booking.end, |f| f.max(booking.end)));
            if gap.is_some() {
                return gap;
            }
        }

        if self.finished {
            return None;
        }
        self.finished = true;
        Some(Gap {
            start: self.frontier,
            end: None,
        })
    }
}
