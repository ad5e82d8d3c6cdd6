//! Gap search for a new booking on one timeline.

use chrono::{Duration, NaiveDateTime};

use crate::config::EngineConfig;
use crate::models::Interval;
use crate::{log_changes, log_checks, log_debug};

use super::core::SchedulerError;
use super::timeline::{Gap, Timeline};

/// Gap selection policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitStrategy {
    /// First gap (chronologically) that fits wins.
    #[default]
    EarliestFit,
    /// Smallest fitting gap wins; earliest on ties.
    BestFit,
}

impl FitStrategy {
    pub fn parse(name: &str) -> Result<Self, SchedulerError> {
        match name {
            "earliest_fit" => Ok(Self::EarliestFit),
            "best_fit" => Ok(Self::BestFit),
            other => Err(SchedulerError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EarliestFit => "earliest_fit",
            Self::BestFit => "best_fit",
        }
    }
}

/// Finds conflict-free intervals on a timeline.
#[derive(Clone, Debug)]
pub struct SlotFinder {
    pub strategy: FitStrategy,
    /// Used for requests that carry no duration
    pub default_duration: Duration,
    pub verbosity: u8,
}

impl Default for SlotFinder {
    fn default() -> Self {
        Self {
            strategy: FitStrategy::EarliestFit,
            default_duration: Duration::minutes(60),
            verbosity: 0,
        }
    }
}

impl SlotFinder {
    /// Build a finder from config, validating the strategy name up front.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SchedulerError> {
        Ok(Self {
            strategy: FitStrategy::parse(&config.fit_strategy)?,
            default_duration: config.default_duration()?,
            verbosity: config.verbosity,
        })
    }

    /// Find the slot for `duration` starting no earlier than `earliest_start`.
    ///
    /// Finite gaps are scanned in chronological order; when none fits, the
    /// slot goes at the open tail, so without a deadline this always
    /// succeeds. With a deadline, a slot ending after it is reported as
    /// [`SchedulerError::DeadlineExceeded`] carrying the proposed interval.
    pub fn find(
        &self,
        timeline: &Timeline,
        duration: Duration,
        earliest_start: NaiveDateTime,
        deadline: Option<NaiveDateTime>,
    ) -> Result<Interval, SchedulerError> {
        if duration <= Duration::zero() {
            return Err(SchedulerError::InvalidDuration(duration));
        }
        let verbosity = self.verbosity;

        let mut chosen: Option<(Gap, Duration)> = None;
        let mut tail: Option<Gap> = None;
        for gap in timeline.gaps_after(earliest_start) {
            let Some(end) = gap.end else {
                tail = Some(gap);
                break;
            };
            let window_start = gap.window_start(earliest_start);
            let room = end - window_start;
            if room < duration {
                log_debug!(
                    verbosity,
                    "  {}: gap from {} too short ({} min < {} min)",
                    timeline.resource_id,
                    window_start,
                    room.num_minutes(),
                    duration.num_minutes()
                );
                continue;
            }
            match self.strategy {
                FitStrategy::EarliestFit => {
                    chosen = Some((gap, room));
                    break;
                }
                FitStrategy::BestFit => {
                    // Strictly smaller only, so the earliest gap keeps ties
                    if chosen.map_or(true, |(_, best)| room < best) {
                        chosen = Some((gap, room));
                    }
                }
            }
        }

        let start = match (chosen, tail) {
            (Some((gap, _)), _) => gap.window_start(earliest_start),
            (None, Some(gap)) => gap.window_start(earliest_start),
            // gaps() always ends with the tail
            (None, None) => earliest_start,
        };
        let slot = Interval::starting_at(start, duration)?;
        log_checks!(
            verbosity,
            "  {}: earliest {} slot is {}",
            timeline.resource_id,
            self.strategy.as_str(),
            slot
        );

        if let Some(deadline) = deadline {
            if slot.end > deadline {
                log_changes!(
                    verbosity,
                    "  {}: slot {} ends after deadline {}",
                    timeline.resource_id,
                    slot,
                    deadline
                );
                return Err(SchedulerError::DeadlineExceeded {
                    proposed: slot,
                    deadline,
                });
            }
        }

        Ok(slot)
    }
}

/// Earliest-fit search with default settings.
pub fn find_slot(
    timeline: &Timeline,
    duration: Duration,
    earliest_start: NaiveDateTime,
    deadline: Option<NaiveDateTime>,
) -> Result<Interval, SchedulerError> {
    SlotFinder::default().find(timeline, duration, earliest_start, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Booking, BookingStatus};
    use crate::scheduler::conflict::has_overlap;
    use chrono::NaiveDate;

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn booking(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Booking {
        Booking {
            id: id.to_string(),
            resource_id: "W1".to_string(),
            start,
            end,
            status: BookingStatus::Open,
            chain_id: None,
            label: None,
        }
    }

    fn timeline(bookings: Vec<Booking>) -> Timeline {
        Timeline::load("W1", bookings).unwrap()
    }

    #[test]
    fn test_empty_timeline_starts_at_earliest() {
        let t = timeline(vec![]);
        let slot = find_slot(&t, Duration::minutes(30), dt(9, 0), None).unwrap();
        assert_eq!(slot, Interval::try_new(dt(9, 0), dt(9, 30)).unwrap());
    }

    #[test]
    fn test_head_gap_too_short_falls_to_tail() {
        // One booking 10:00-11:00, 90 minutes requested from 09:00
        let t = timeline(vec![booking("a", dt(10, 0), dt(11, 0))]);
        let slot = find_slot(&t, Duration::minutes(90), dt(9, 0), None).unwrap();
        assert_eq!(slot, Interval::try_new(dt(11, 0), dt(12, 30)).unwrap());
    }

    #[test]
    fn test_head_gap_used_when_it_fits() {
        let t = timeline(vec![booking("a", dt(10, 0), dt(11, 0))]);
        let slot = find_slot(&t, Duration::minutes(60), dt(9, 0), None).unwrap();
        assert_eq!(slot, Interval::try_new(dt(9, 0), dt(10, 0)).unwrap());
    }

    #[test]
    fn test_inner_gap_clipped_to_earliest() {
        let t = timeline(vec![
            booking("a", dt(8, 0), dt(9, 0)),
            booking("b", dt(11, 0), dt(12, 0)),
        ]);
        let slot = find_slot(&t, Duration::minutes(60), dt(9, 30), None).unwrap();
        assert_eq!(slot, Interval::try_new(dt(9, 30), dt(10, 30)).unwrap());

        // Clipped window of 30 min is too short
        let slot = find_slot(&t, Duration::minutes(60), dt(10, 30), None).unwrap();
        assert_eq!(slot, Interval::try_new(dt(12, 0), dt(13, 0)).unwrap());
    }

    #[test]
    fn test_earliest_fit_takes_first_sufficient_gap() {
        let t = timeline(vec![
            booking("a", dt(8, 0), dt(9, 0)),
            booking("b", dt(12, 0), dt(13, 0)), // 3h gap before
            booking("c", dt(14, 0), dt(15, 0)), // 1h gap before
        ]);
        let slot = find_slot(&t, Duration::minutes(60), dt(9, 0), None).unwrap();
        assert_eq!(slot.start, dt(9, 0));
    }

    #[test]
    fn test_best_fit_takes_tightest_gap() {
        let t = timeline(vec![
            booking("a", dt(8, 0), dt(9, 0)),
            booking("b", dt(12, 0), dt(13, 0)),
            booking("c", dt(14, 0), dt(15, 0)),
        ]);
        let finder = SlotFinder {
            strategy: FitStrategy::BestFit,
            ..SlotFinder::default()
        };
        let slot = finder
            .find(&t, Duration::minutes(60), dt(9, 0), None)
            .unwrap();
        assert_eq!(slot, Interval::try_new(dt(13, 0), dt(14, 0)).unwrap());
    }

    #[test]
    fn test_best_fit_tie_keeps_earliest() {
        let t = timeline(vec![
            booking("a", dt(8, 0), dt(9, 0)),
            booking("b", dt(10, 0), dt(11, 0)),
            booking("c", dt(12, 0), dt(13, 0)),
        ]);
        let finder = SlotFinder {
            strategy: FitStrategy::BestFit,
            ..SlotFinder::default()
        };
        let slot = finder
            .find(&t, Duration::minutes(60), dt(9, 0), None)
            .unwrap();
        assert_eq!(slot.start, dt(9, 0));
    }

    #[test]
    fn test_deadline_exceeded_reports_proposal() {
        let t = timeline(vec![booking("a", dt(10, 0), dt(11, 0))]);
        let err = find_slot(&t, Duration::minutes(90), dt(9, 0), Some(dt(12, 0))).unwrap_err();
        match err {
            SchedulerError::DeadlineExceeded { proposed, deadline } => {
                assert_eq!(proposed, Interval::try_new(dt(11, 0), dt(12, 30)).unwrap());
                assert_eq!(deadline, dt(12, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deadline_met_exactly() {
        let t = timeline(vec![booking("a", dt(10, 0), dt(11, 0))]);
        let slot = find_slot(&t, Duration::minutes(90), dt(9, 0), Some(dt(12, 30))).unwrap();
        assert_eq!(slot.end, dt(12, 30));
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let t = timeline(vec![]);
        assert!(matches!(
            find_slot(&t, Duration::zero(), dt(9, 0), None),
            Err(SchedulerError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let config = EngineConfig {
            fit_strategy: "worst_fit".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            SlotFinder::from_config(&config),
            Err(SchedulerError::UnknownStrategy(s)) if s == "worst_fit"
        ));
    }

    #[test]
    fn test_tail_past_max_datetime_overflows() {
        let max = NaiveDateTime::MAX;
        let t = timeline(vec![booking(
            "a",
            max - Duration::hours(2),
            max - Duration::minutes(30),
        )]);
        assert_eq!(
            find_slot(&t, Duration::hours(1), max - Duration::hours(2), None),
            Err(SchedulerError::TimeOverflow)
        );
    }

    #[test]
    fn test_out_of_range_default_duration() {
        let config = EngineConfig {
            default_duration_minutes: i64::MAX / 2,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SlotFinder::from_config(&config),
            Err(SchedulerError::TimeOverflow)
        ));

        let config = EngineConfig {
            default_duration_minutes: i64::MIN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SlotFinder::from_config(&config),
            Err(SchedulerError::TimeOverflow)
        ));

        let config = EngineConfig {
            default_duration_minutes: -5,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SlotFinder::from_config(&config),
            Err(SchedulerError::InvalidDuration(d)) if d == Duration::minutes(-5)
        ));
    }

    #[test]
    fn test_found_slot_never_overlaps() {
        let t = timeline(vec![
            booking("a", dt(8, 0), dt(9, 0)),
            booking("b", dt(9, 20), dt(10, 0)),
            booking("c", dt(10, 45), dt(11, 30)),
            booking("d", dt(12, 0), dt(12, 10)),
        ]);
        for strategy in [FitStrategy::EarliestFit, FitStrategy::BestFit] {
            let finder = SlotFinder {
                strategy,
                ..SlotFinder::default()
            };
            for minutes in [10, 20, 30, 45, 60, 120] {
                for earliest in [dt(7, 0), dt(8, 30), dt(9, 10), dt(10, 50), dt(12, 5)] {
                    let slot = finder
                        .find(&t, Duration::minutes(minutes), earliest, None)
                        .unwrap();
                    assert!(slot.start >= earliest);
                    assert_eq!(slot.duration(), Duration::minutes(minutes));
                    assert!(!has_overlap(&t, &slot, None));
                }
            }
        }
    }

    #[test]
    fn test_deterministic_for_fixed_snapshot() {
        let t = timeline(vec![
            booking("a", dt(9, 0), dt(10, 0)),
            booking("b", dt(10, 30), dt(11, 0)),
        ]);
        let first = find_slot(&t, Duration::minutes(30), dt(9, 0), None).unwrap();
        let second = find_slot(&t, Duration::minutes(30), dt(9, 0), None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.start, dt(10, 0));
    }
}
