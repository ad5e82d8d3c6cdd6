//! Rust implementation of the slotwise resource-time allocation engine.
//!
//! Decides *when* and *where* work runs on workstations given their existing
//! bookings: conflict-free slot search, overlap validation for manual edits,
//! cascade shifting after a reschedule, and back-to-back chain scheduling.
//! The host application owns storage; every call receives a snapshot and
//! returns proposed changes.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::{Duration, NaiveDateTime};
use pyo3::prelude::*;

mod config;
pub mod logging;
mod models;
pub mod scheduler;
pub mod utilization;

pub use config::EngineConfig;
pub use models::{
    Booking, BookingShift, BookingStatus, ChainJob, ChainPlacement, ConflictingBooking, Interval,
    Placement, Resource, ScheduleRequest,
};
pub use scheduler::{
    check_no_overlap, find_slot, has_overlap, schedule_chain, shift_following, FitStrategy,
    Scheduler, SchedulerError, SlotFinder, Timeline,
};
pub use utilization::ResourceUtilization;

fn to_py_err(err: SchedulerError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(err.to_string())
}

/// Find the earliest conflict-free slot on one workstation.
///
/// # Arguments
/// * `bookings` - Existing bookings; only those on `resource_id` are used
/// * `resource_id` - Workstation to search
/// * `earliest_start` - The slot never starts before this
/// * `duration` - Requested length (config default when None)
/// * `deadline` - Latest acceptable end
/// * `config` - Engine configuration (fit strategy, defaults)
///
/// # Raises
/// * ValueError on malformed bookings, unknown strategy, or a missed deadline
#[pyfunction]
#[pyo3(name = "find_slot", signature = (bookings, resource_id, earliest_start, duration=None, deadline=None, config=None))]
fn py_find_slot(
    bookings: Vec<Booking>,
    resource_id: String,
    earliest_start: NaiveDateTime,
    duration: Option<Duration>,
    deadline: Option<NaiveDateTime>,
    config: Option<EngineConfig>,
) -> PyResult<Interval> {
    let config = config.unwrap_or_default();
    let finder = SlotFinder::from_config(&config).map_err(to_py_err)?;
    let own: Vec<Booking> = bookings
        .into_iter()
        .filter(|b| b.resource_id == resource_id)
        .collect();
    let timeline = Timeline::load(resource_id, own).map_err(to_py_err)?;
    finder
        .find(
            &timeline,
            duration.unwrap_or(finder.default_duration),
            earliest_start,
            deadline,
        )
        .map_err(to_py_err)
}

/// Place a request on the best of its candidate workstations.
///
/// # Raises
/// * ValueError on unknown resources, a missed deadline, or bad input
#[pyfunction]
#[pyo3(name = "schedule_request", signature = (resources, bookings, request, config=None))]
fn py_schedule_request(
    resources: Vec<Resource>,
    bookings: Vec<Booking>,
    request: ScheduleRequest,
    config: Option<EngineConfig>,
) -> PyResult<Placement> {
    let scheduler =
        Scheduler::new(resources, bookings, config.unwrap_or_default()).map_err(to_py_err)?;
    scheduler.schedule_request(&request).map_err(to_py_err)
}

/// Check that moving a booking to `[new_start, new_end)` conflicts with nothing.
///
/// # Raises
/// * ValueError listing every overlapping booking on conflict
#[pyfunction]
#[pyo3(name = "validate_edit", signature = (resources, bookings, booking_id, new_start, new_end, new_resource=None))]
fn py_validate_edit(
    resources: Vec<Resource>,
    bookings: Vec<Booking>,
    booking_id: String,
    new_start: NaiveDateTime,
    new_end: NaiveDateTime,
    new_resource: Option<String>,
) -> PyResult<()> {
    let candidate = Interval::try_new(new_start, new_end).map_err(to_py_err)?;
    let scheduler =
        Scheduler::new(resources, bookings, EngineConfig::default()).map_err(to_py_err)?;
    scheduler
        .validate_edit(&booking_id, candidate, new_resource.as_deref())
        .map_err(to_py_err)
}

/// Compute the shifts that follow moving a booking to `[new_start, new_end)`.
///
/// # Returns
/// * List of BookingShift in processing order; nothing is persisted
#[pyfunction]
#[pyo3(name = "shift_following", signature = (bookings, booking_id, new_start, new_end, config=None))]
fn py_shift_following(
    bookings: Vec<Booking>,
    booking_id: String,
    new_start: NaiveDateTime,
    new_end: NaiveDateTime,
    config: Option<EngineConfig>,
) -> PyResult<Vec<BookingShift>> {
    let config = config.unwrap_or_default();
    let new_interval = Interval::try_new(new_start, new_end).map_err(to_py_err)?;
    let resource_id = bookings
        .iter()
        .find(|b| b.id == booking_id)
        .map(|b| b.resource_id.clone())
        .ok_or_else(|| to_py_err(SchedulerError::UnknownBooking(booking_id.clone())))?;
    let own: Vec<Booking> = bookings
        .into_iter()
        .filter(|b| b.resource_id == resource_id)
        .collect();
    let timeline = Timeline::load(resource_id, own).map_err(to_py_err)?;
    shift_following(&timeline, &booking_id, new_interval, config.verbosity).map_err(to_py_err)
}

/// Schedule a work order's operations back-to-back from `anchor`.
///
/// # Raises
/// * ValueError if any operation misses its deadline or the chain misses
///   `deadline`; no placements are returned in that case
#[pyfunction]
#[pyo3(name = "schedule_chain", signature = (resources, bookings, jobs, anchor, chain_id=None, deadline=None, config=None))]
fn py_schedule_chain(
    resources: Vec<Resource>,
    bookings: Vec<Booking>,
    jobs: Vec<ChainJob>,
    anchor: NaiveDateTime,
    chain_id: Option<String>,
    deadline: Option<NaiveDateTime>,
    config: Option<EngineConfig>,
) -> PyResult<Vec<ChainPlacement>> {
    let scheduler =
        Scheduler::new(resources, bookings, config.unwrap_or_default()).map_err(to_py_err)?;
    scheduler
        .schedule_chain(chain_id.as_deref(), &jobs, anchor, deadline)
        .map_err(to_py_err)
}

/// Per-workstation utilization for bookings inside `[window_start, window_end)`.
#[pyfunction]
#[pyo3(name = "workstation_utilization")]
fn py_workstation_utilization(
    resources: Vec<Resource>,
    bookings: Vec<Booking>,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> PyResult<Vec<ResourceUtilization>> {
    let window = Interval::try_new(window_start, window_end).map_err(to_py_err)?;
    let scheduler =
        Scheduler::new(resources, bookings, EngineConfig::default()).map_err(to_py_err)?;
    Ok(scheduler.utilization(window))
}

/// The slotwise.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Interval>()?;
    m.add_class::<BookingStatus>()?;
    m.add_class::<Booking>()?;
    m.add_class::<Resource>()?;
    m.add_class::<ScheduleRequest>()?;
    m.add_class::<ChainJob>()?;
    m.add_class::<Placement>()?;
    m.add_class::<BookingShift>()?;
    m.add_class::<ChainPlacement>()?;
    m.add_class::<ResourceUtilization>()?;

    // Config types
    m.add_class::<EngineConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_find_slot, m)?)?;
    m.add_function(wrap_pyfunction!(py_schedule_request, m)?)?;
    m.add_function(wrap_pyfunction!(py_validate_edit, m)?)?;
    m.add_function(wrap_pyfunction!(py_shift_following, m)?)?;
    m.add_function(wrap_pyfunction!(py_schedule_chain, m)?)?;
    m.add_function(wrap_pyfunction!(py_workstation_utilization, m)?)?;

    Ok(())
}
