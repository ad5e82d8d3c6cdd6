//! Core data types for the scheduling engine.

use chrono::{Duration, NaiveDateTime};
use pyo3::prelude::*;
use std::fmt;

use crate::scheduler::SchedulerError;

/// Half-open time interval `[start, end)`.
#[pyclass]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    #[pyo3(get)]
    pub start: NaiveDateTime,
    #[pyo3(get)]
    pub end: NaiveDateTime,
}

impl Interval {
    /// Build an interval, rejecting empty or inverted ranges.
    pub fn try_new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, SchedulerError> {
        if end <= start {
            return Err(SchedulerError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Interval of `duration` starting at `start`.
    pub fn starting_at(start: NaiveDateTime, duration: Duration) -> Result<Self, SchedulerError> {
        if duration <= Duration::zero() {
            return Err(SchedulerError::InvalidDuration(duration));
        }
        let end = start
            .checked_add_signed(duration)
            .ok_or(SchedulerError::TimeOverflow)?;
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap: touching endpoints do not conflict.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `other` lies entirely inside this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[pymethods]
impl Interval {
    #[new]
    fn py_new(start: NaiveDateTime, end: NaiveDateTime) -> PyResult<Self> {
        Self::try_new(start, end)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!("Interval(start={}, end={})", self.start, self.end)
    }
}

/// Lifecycle status of a booking, mirroring the host's job card states.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Open,
    WorkInProgress,
    MaterialTransferred,
    OnHold,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Parse the host's display label. Unknown labels are treated as open.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "work in progress" | "in progress" | "in_progress" => Self::WorkInProgress,
            "material transferred" => Self::MaterialTransferred,
            "on hold" | "on_hold" => Self::OnHold,
            "completed" => Self::Completed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Open,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::WorkInProgress => "Work In Progress",
            Self::MaterialTransferred => "Material Transferred",
            Self::OnHold => "On Hold",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Completed and cancelled bookings are never moved by the engine.
    pub fn is_movable(&self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A timed booking of one job on one resource.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Booking {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub resource_id: String,
    #[pyo3(get, set)]
    pub start: NaiveDateTime,
    #[pyo3(get, set)]
    pub end: NaiveDateTime,
    #[pyo3(get, set)]
    pub status: BookingStatus,
    /// Parent job chain (work order), if any.
    #[pyo3(get, set)]
    pub chain_id: Option<String>,
    /// Human-readable label used in conflict messages, e.g. the operation name.
    #[pyo3(get, set)]
    pub label: Option<String>,
}

impl Booking {
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }
}

#[pymethods]
impl Booking {
    #[new]
    #[pyo3(signature = (id, resource_id, start, end, status=BookingStatus::Open, chain_id=None, label=None))]
    fn new(
        id: String,
        resource_id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
        status: BookingStatus,
        chain_id: Option<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            id,
            resource_id,
            start,
            end,
            status,
            chain_id,
            label,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Booking(id={:?}, resource_id={:?}, start={}, end={}, status={})",
            self.id,
            self.resource_id,
            self.start,
            self.end,
            self.status.label()
        )
    }
}

/// A schedulable resource (workstation). The type tag is for grouping only.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub resource_type: Option<String>,
}

#[pymethods]
impl Resource {
    #[new]
    #[pyo3(signature = (id, resource_type=None))]
    fn new(id: String, resource_type: Option<String>) -> Self {
        Self { id, resource_type }
    }

    fn __repr__(&self) -> String {
        format!(
            "Resource(id={:?}, resource_type={:?})",
            self.id, self.resource_type
        )
    }
}

/// A request for one new booking on one of several candidate resources.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ScheduleRequest {
    /// Falls back to the configured default when unset.
    #[pyo3(get, set)]
    pub duration: Option<Duration>,
    #[pyo3(get, set)]
    pub earliest_start: NaiveDateTime,
    #[pyo3(get, set)]
    pub deadline: Option<NaiveDateTime>,
    /// Candidate resources in preference order.
    #[pyo3(get, set)]
    pub resource_ids: Vec<String>,
}

#[pymethods]
impl ScheduleRequest {
    #[new]
    #[pyo3(signature = (resource_ids, earliest_start, duration=None, deadline=None))]
    fn new(
        resource_ids: Vec<String>,
        earliest_start: NaiveDateTime,
        duration: Option<Duration>,
        deadline: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            duration,
            earliest_start,
            deadline,
            resource_ids,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleRequest(resources={:?}, earliest_start={}, deadline={:?})",
            self.resource_ids, self.earliest_start, self.deadline
        )
    }
}

/// One operation of a job chain, in sequence order.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ChainJob {
    #[pyo3(get, set)]
    pub job_id: String,
    #[pyo3(get, set)]
    pub resource_id: String,
    #[pyo3(get, set)]
    pub duration: Option<Duration>,
    /// Per-job deadline, checked by the slot finder.
    #[pyo3(get, set)]
    pub deadline: Option<NaiveDateTime>,
}

#[pymethods]
impl ChainJob {
    #[new]
    #[pyo3(signature = (job_id, resource_id, duration=None, deadline=None))]
    fn new(
        job_id: String,
        resource_id: String,
        duration: Option<Duration>,
        deadline: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            job_id,
            resource_id,
            duration,
            deadline,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ChainJob(job_id={:?}, resource_id={:?})",
            self.job_id, self.resource_id
        )
    }
}

/// Where and when a single request was placed.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    #[pyo3(get)]
    pub resource_id: String,
    #[pyo3(get)]
    pub interval: Interval,
}

#[pymethods]
impl Placement {
    fn __repr__(&self) -> String {
        format!(
            "Placement(resource_id={:?}, interval={})",
            self.resource_id, self.interval
        )
    }
}

/// A proposed move of an existing booking, produced by a cascade.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct BookingShift {
    #[pyo3(get)]
    pub booking_id: String,
    #[pyo3(get)]
    pub previous: Interval,
    #[pyo3(get)]
    pub interval: Interval,
}

#[pymethods]
impl BookingShift {
    fn __repr__(&self) -> String {
        format!(
            "BookingShift(booking_id={:?}, {} -> {})",
            self.booking_id, self.previous, self.interval
        )
    }
}

/// Computed placement of one chain job.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPlacement {
    #[pyo3(get)]
    pub job_id: String,
    #[pyo3(get)]
    pub resource_id: String,
    #[pyo3(get)]
    pub interval: Interval,
}

#[pymethods]
impl ChainPlacement {
    fn __repr__(&self) -> String {
        format!(
            "ChainPlacement(job_id={:?}, resource_id={:?}, interval={})",
            self.job_id, self.resource_id, self.interval
        )
    }
}

/// Existing booking that blocks a proposed interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictingBooking {
    pub id: String,
    pub label: Option<String>,
}

impl fmt::Display for ConflictingBooking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({})", label, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}
