//! Resource-time allocation engine.
//!
//! Pure computations over one snapshot of a resource's bookings: gap search,
//! overlap validation, cascade shifting and chain scheduling. Every operation
//! returns proposed changes and leaves persistence to the caller.

mod cascade;
mod chain;
mod conflict;
mod core;
mod slot_finder;
mod timeline;

pub use cascade::shift_following;
pub use chain::schedule_chain;
pub use conflict::{check_no_overlap, find_overlaps, has_overlap};
pub use core::{Scheduler, SchedulerError};
pub use slot_finder::{find_slot, FitStrategy, SlotFinder};
pub use timeline::{Gap, Gaps, Timeline};
