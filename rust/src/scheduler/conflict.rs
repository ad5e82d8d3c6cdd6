//! Overlap checks for externally chosen intervals (manual edits).

use crate::models::{Booking, ConflictingBooking, Interval};

use super::core::SchedulerError;
use super::timeline::Timeline;

/// Bookings on `timeline` that overlap `candidate`, skipping `exclude_id`.
pub fn find_overlaps<'a>(
    timeline: &'a Timeline,
    candidate: &'a Interval,
    exclude_id: Option<&'a str>,
) -> impl Iterator<Item = &'a Booking> {
    timeline
        .overlapping(candidate)
        .filter(move |b| Some(b.id.as_str()) != exclude_id)
}

/// Whether `candidate` overlaps any booking other than `exclude_id`.
pub fn has_overlap(timeline: &Timeline, candidate: &Interval, exclude_id: Option<&str>) -> bool {
    find_overlaps(timeline, candidate, exclude_id).next().is_some()
}

/// Guard for committing a manual move: fails with every conflicting booking.
pub fn check_no_overlap(
    timeline: &Timeline,
    candidate: &Interval,
    exclude_id: Option<&str>,
) -> Result<(), SchedulerError> {
    let conflicts: Vec<ConflictingBooking> = find_overlaps(timeline, candidate, exclude_id)
        .map(|b| ConflictingBooking {
            id: b.id.clone(),
            label: b.label.clone(),
        })
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(SchedulerError::OverlapConflict {
            resource_id: timeline.resource_id.clone(),
            conflicts,
        })
    }
}
