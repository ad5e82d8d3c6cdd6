//! Configuration types for the scheduling engine.

use chrono::Duration;
use pyo3::prelude::*;

use crate::scheduler::SchedulerError;

/// Engine-wide knobs applied to every call.
#[pyclass]
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Gap selection policy: "earliest_fit" or "best_fit"
    #[pyo3(get, set)]
    pub fit_strategy: String,
    /// Duration used when a request or chain job carries none
    #[pyo3(get, set)]
    pub default_duration_minutes: i64,
    /// Deadline applied to requests without one, in days after earliest start
    #[pyo3(get, set)]
    pub default_deadline_days: Option<i64>,
    /// Log verbosity (0 silent .. 3 debug)
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fit_strategy: "earliest_fit".to_string(),
            default_duration_minutes: 60,
            default_deadline_days: None,
            verbosity: 0,
        }
    }
}

impl EngineConfig {
    /// Fails with `TimeOverflow` when the minutes do not fit a `Duration`.
    pub fn default_duration(&self) -> Result<Duration, SchedulerError> {
        let duration = Duration::try_minutes(self.default_duration_minutes)
            .ok_or(SchedulerError::TimeOverflow)?;
        if duration <= Duration::zero() {
            return Err(SchedulerError::InvalidDuration(duration));
        }
        Ok(duration)
    }
}

#[pymethods]
impl EngineConfig {
    #[new]
    #[pyo3(signature = (
        fit_strategy=None,
        default_duration_minutes=None,
        default_deadline_days=None,
        verbosity=None
    ))]
    fn new(
        fit_strategy: Option<String>,
        default_duration_minutes: Option<i64>,
        default_deadline_days: Option<i64>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            fit_strategy: fit_strategy.unwrap_or(defaults.fit_strategy),
            default_duration_minutes: default_duration_minutes
                .unwrap_or(defaults.default_duration_minutes),
            default_deadline_days: default_deadline_days.or(defaults.default_deadline_days),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(fit_strategy={:?}, default_duration_minutes={}, default_deadline_days={:?})",
            self.fit_strategy, self.default_duration_minutes, self.default_deadline_days
        )
    }
}
