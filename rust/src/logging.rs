//! Logging macros for the engine with verbosity level control.
//!
//! Events are emitted through `tracing` under the `slotwise` target; the host
//! installs whatever subscriber it wants. Verbosity levels:
//! - 0: SILENT (nothing)
//! - 1: CHANGES (placements, shifts) -> `info`
//! - 2: CHECKS (gap and conflict checks) -> `debug`
//! - 3: DEBUG (full algorithm internals) -> `trace`

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: placements, cascade shifts, rejected requests.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!(target: "slotwise", $($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: gap consideration, skip reasons, frozen bookings.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!(target: "slotwise", $($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: per-gap and per-booking internals.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!(target: "slotwise", $($arg)*);
        }
    };
}
