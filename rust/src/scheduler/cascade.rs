//! Forward propagation of a rescheduled booking's new end.

use crate::models::{BookingShift, Interval};
use crate::{log_changes, log_checks, log_debug};

use super::core::SchedulerError;
use super::slot_finder::SlotFinder;
use super::timeline::Timeline;

/// Compute the shifts needed after `booking_id` moves to `new_interval`.
///
/// Only bookings whose start is at or after the moved booking's *original*
/// start are considered, in timeline order. A booking that starts before the
/// running cursor slides to the cursor with its duration preserved. Bookings
/// that started earlier than the moved one are never touched, even if the
/// move now overlaps them or opens a gap before them.
///
/// Completed bookings are not movable: they are left in place and the cursor
/// jumps past their end. A shifted booking that would land on one goes to the
/// first gap after the cursor that clears every frozen booking.
///
/// Returns the shifts in processing order; the timeline is not modified.
pub fn shift_following(
    timeline: &Timeline,
    booking_id: &str,
    new_interval: Interval,
    verbosity: u8,
) -> Result<Vec<BookingShift>, SchedulerError> {
    let changed = timeline
        .get(booking_id)
        .ok_or_else(|| SchedulerError::UnknownBooking(booking_id.to_string()))?;
    let original_start = changed.start;

    let frozen = Timeline::load(
        timeline.resource_id.clone(),
        timeline
            .bookings()
            .iter()
            .filter(|b| b.id != booking_id && !b.status.is_movable())
            .cloned(),
    )?;
    let finder = SlotFinder {
        verbosity,
        ..SlotFinder::default()
    };

    let mut cursor = new_interval.end;
    let mut shifts = Vec::new();

    log_checks!(
        verbosity,
        "Cascade on {} from {} moved to {}",
        timeline.resource_id,
        booking_id,
        new_interval
    );

    for booking in timeline
        .bookings()
        .iter()
        .filter(|b| b.id != booking_id && b.start >= original_start)
    {
        if booking.start >= cursor {
            log_debug!(verbosity, "  {} clear of cursor {}", booking.id, cursor);
            cursor = booking.end;
            continue;
        }

        if !booking.status.is_movable() {
            log_checks!(
                verbosity,
                "  Skipping {}: {} bookings are not moved",
                booking.id,
                booking.status.label()
            );
            cursor = cursor.max(booking.end);
            continue;
        }

        let shifted = if frozen.is_empty() {
            Interval::starting_at(cursor, booking.duration())?
        } else {
            finder.find(&frozen, booking.duration(), cursor, None)?
        };
        if shifted.start > cursor {
            log_checks!(
                verbosity,
                "  {} cannot start at {}: frozen booking in the way",
                booking.id,
                cursor
            );
        }
        log_changes!(
            verbosity,
            "  Shifted {} from {} to {}",
            booking.id,
            booking.interval(),
            shifted
        );
        shifts.push(BookingShift {
            booking_id: booking.id.clone(),
            previous: booking.interval(),
            interval: shifted,
        });
        cursor = shifted.end;
    }

    Ok(shifts)
}
