//! Per-resource utilization over a reporting window.

use pyo3::prelude::*;
use rustc_hash::FxHashMap;

use crate::models::{Booking, BookingStatus, Interval};

/// Load summary for one resource.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceUtilization {
    #[pyo3(get)]
    pub resource_id: String,
    #[pyo3(get)]
    pub resource_type: Option<String>,
    #[pyo3(get)]
    pub total_jobs: usize,
    #[pyo3(get)]
    pub completed_jobs: usize,
    #[pyo3(get)]
    pub total_minutes: i64,
    #[pyo3(get)]
    pub avg_minutes: f64,
    /// Booked share of the window (0.0..1.0 for non-overlapping bookings)
    #[pyo3(get)]
    pub busy_ratio: f64,
}

#[pymethods]
impl ResourceUtilization {
    fn __repr__(&self) -> String {
        format!(
            "ResourceUtilization(resource_id={:?}, total_jobs={}, total_minutes={}, busy_ratio={:.2})",
            self.resource_id, self.total_jobs, self.total_minutes, self.busy_ratio
        )
    }
}

/// Summarize bookings that lie entirely inside `window`, per resource.
///
/// Cancelled bookings are ignored. Resources with no qualifying booking are
/// absent. Sorted by total minutes descending, then resource id.
pub fn summarize<'a, I, F>(bookings: I, resource_type: F, window: Interval) -> Vec<ResourceUtilization>
where
    I: IntoIterator<Item = &'a Booking>,
    F: Fn(&str) -> Option<String>,
{
    let window_minutes = window.duration().num_minutes();
    let mut by_resource: FxHashMap<&str, (usize, usize, i64)> = FxHashMap::default();

    for booking in bookings {
        if booking.status == BookingStatus::Cancelled || !window.contains(&booking.interval()) {
            continue;
        }
        let entry = by_resource
            .entry(booking.resource_id.as_str())
            .or_insert((0, 0, 0));
        entry.0 += 1;
        if booking.status == BookingStatus::Completed {
            entry.1 += 1;
        }
        entry.2 += booking.duration().num_minutes();
    }

    let mut result: Vec<ResourceUtilization> = by_resource
        .into_iter()
        .map(|(resource_id, (total_jobs, completed_jobs, total_minutes))| {
            let busy_ratio = if window_minutes > 0 {
                total_minutes as f64 / window_minutes as f64
            } else {
                0.0
            };
            ResourceUtilization {
                resource_id: resource_id.to_string(),
                resource_type: resource_type(resource_id),
                total_jobs,
                completed_jobs,
                total_minutes,
                avg_minutes: total_minutes as f64 / total_jobs as f64,
                busy_ratio,
            }
        })
        .collect();

    result.sort_by(|a, b| {
        b.total_minutes
            .cmp(&a.total_minutes)
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });
    result
}
