//! Back-to-back scheduling of a dependent job chain.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

use crate::models::{Booking, BookingStatus, ChainJob, ChainPlacement};
use crate::{log_changes, log_checks};

use super::core::SchedulerError;
use super::slot_finder::SlotFinder;
use super::timeline::Timeline;

/// Schedule `jobs` in order, each on its own resource, starting at `anchor`.
///
/// Each job goes through the slot finder with the previous job's end as its
/// earliest start. `load_timeline` supplies a resource's timeline (the caller
/// leaves out the chain's own bookings, since those are being recomputed).
/// Placed jobs are added to the working timelines so later jobs on the same
/// resource see them.
///
/// The whole chain is computed before `chain_deadline` is checked against the
/// last job's end. Any failure returns an error and no placements.
pub fn schedule_chain<F>(
    finder: &SlotFinder,
    jobs: &[ChainJob],
    anchor: NaiveDateTime,
    chain_deadline: Option<NaiveDateTime>,
    mut load_timeline: F,
) -> Result<Vec<ChainPlacement>, SchedulerError>
where
    F: FnMut(&str) -> Result<Timeline, SchedulerError>,
{
    let verbosity = finder.verbosity;
    let mut timelines: FxHashMap<String, Timeline> = FxHashMap::default();
    let mut placements: Vec<ChainPlacement> = Vec::with_capacity(jobs.len());
    let mut cursor = anchor;

    for job in jobs {
        let timeline = match timelines.entry(job.resource_id.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(load_timeline(&job.resource_id)?),
        };

        let duration = job.duration.unwrap_or(finder.default_duration);
        let interval = match finder.find(timeline, duration, cursor, job.deadline) {
            Ok(interval) => interval,
            Err(SchedulerError::DeadlineExceeded { proposed, deadline }) => {
                log_changes!(
                    verbosity,
                    "Chain aborted at {}: no slot on {} before {}",
                    job.job_id,
                    job.resource_id,
                    deadline
                );
                return Err(SchedulerError::NoSlotAvailable {
                    job_id: job.job_id.clone(),
                    deadline,
                    earliest_end: proposed.end,
                });
            }
            Err(e) => return Err(e),
        };

        timeline.insert(Booking {
            id: job.job_id.clone(),
            resource_id: job.resource_id.clone(),
            start: interval.start,
            end: interval.end,
            status: BookingStatus::Open,
            chain_id: None,
            label: None,
        })?;

        log_checks!(
            verbosity,
            "  Chain job {} on {} at {}",
            job.job_id,
            job.resource_id,
            interval
        );
        placements.push(ChainPlacement {
            job_id: job.job_id.clone(),
            resource_id: job.resource_id.clone(),
            interval,
        });
        cursor = interval.end;
    }

    if let (Some(deadline), Some(last)) = (chain_deadline, placements.last()) {
        if last.interval.end > deadline {
            log_changes!(
                verbosity,
                "Chain ends at {} after deadline {}, discarding {} placements",
                last.interval.end,
                deadline,
                placements.len()
            );
            return Err(SchedulerError::NoSlotAvailable {
                job_id: last.job_id.clone(),
                deadline,
                earliest_end: last.interval.end,
            });
        }
    }

    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Interval;
    use chrono::{Duration, NaiveDate};

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn booking(id: &str, resource: &str, start: NaiveDateTime, end: NaiveDateTime) -> Booking {
        Booking {
            id: id.to_string(),
            resource_id: resource.to_string(),
            start,
            end,
            status: BookingStatus::Open,
            chain_id: None,
            label: None,
        }
    }

    fn job(id: &str, resource: &str, minutes: i64) -> ChainJob {
        ChainJob {
            job_id: id.to_string(),
            resource_id: resource.to_string(),
            duration: Some(Duration::minutes(minutes)),
            deadline: None,
        }
    }

    fn loader(
        bookings: Vec<Booking>,
    ) -> impl FnMut(&str) -> Result<Timeline, SchedulerError> {
        move |resource: &str| {
            let own: Vec<Booking> = bookings
                .iter()
                .filter(|b| b.resource_id == resource)
                .cloned()
                .collect();
            Timeline::load(resource, own)
        }
    }

    fn iv(start: NaiveDateTime, end: NaiveDateTime) -> Interval {
        Interval::try_new(start, end).unwrap()
    }

    #[test]
    fn test_chain_back_to_back_on_free_resources() {
        let jobs = vec![job("op1", "cut", 60), job("op2", "weld", 45), job("op3", "qc", 30)];
        let placed =
            schedule_chain(&SlotFinder::default(), &jobs, dt(8, 0), None, loader(vec![])).unwrap();
        let intervals: Vec<Interval> = placed.iter().map(|p| p.interval).collect();
        assert_eq!(
            intervals,
            vec![
                iv(dt(8, 0), dt(9, 0)),
                iv(dt(9, 0), dt(9, 45)),
                iv(dt(9, 45), dt(10, 15)),
            ]
        );
    }

    #[test]
    fn test_chain_routes_around_busy_resource() {
        let existing = vec![booking("busy", "weld", dt(9, 0), dt(10, 0))];
        let jobs = vec![job("op1", "cut", 60), job("op2", "weld", 45), job("op3", "qc", 30)];
        let placed = schedule_chain(
            &SlotFinder::default(),
            &jobs,
            dt(8, 0),
            None,
            loader(existing),
        )
        .unwrap();
        assert_eq!(placed[1].interval, iv(dt(10, 0), dt(10, 45)));
        assert_eq!(placed[2].interval, iv(dt(10, 45), dt(11, 15)));

        assert!(placed[0].interval.start >= dt(8, 0));
        for pair in placed.windows(2) {
            assert!(pair[0].interval.end <= pair[1].interval.start);
        }
    }

    #[test]
    fn test_chain_reuses_resource_timeline() {
        let jobs = vec![job("op1", "cut", 30), job("op2", "cut", 30)];
        let mut loads = 0;
        let placed = schedule_chain(&SlotFinder::default(), &jobs, dt(8, 0), None, |r: &str| {
            loads += 1;
            Timeline::load(r, Vec::new())
        })
        .unwrap();
        assert_eq!(loads, 1);
        assert_eq!(placed[1].interval, iv(dt(8, 30), dt(9, 0)));
    }

    #[test]
    fn test_chain_deadline_is_all_or_nothing() {
        let existing = vec![booking("busy", "qc", dt(9, 0), dt(12, 0))];
        let jobs = vec![job("op1", "cut", 60), job("op2", "qc", 60)];
        let err = schedule_chain(
            &SlotFinder::default(),
            &jobs,
            dt(8, 0),
            Some(dt(12, 30)),
            loader(existing),
        )
        .unwrap_err();
        match err {
            SchedulerError::NoSlotAvailable {
                job_id,
                deadline,
                earliest_end,
            } => {
                assert_eq!(job_id, "op2");
                assert_eq!(deadline, dt(12, 30));
                assert_eq!(earliest_end, dt(13, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_per_job_deadline_aborts_chain() {
        let existing = vec![booking("busy", "cut", dt(8, 0), dt(10, 0))];
        let mut first = job("op1", "cut", 60);
        first.deadline = Some(dt(10, 30));
        let jobs = vec![first, job("op2", "qc", 60)];
        let err = schedule_chain(
            &SlotFinder::default(),
            &jobs,
            dt(8, 0),
            None,
            loader(existing),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulerError::NoSlotAvailable { job_id, .. } if job_id == "op1"));
    }

    #[test]
    fn test_unknown_resource_propagates() {
        let jobs = vec![job("op1", "ghost", 60)];
        let err = schedule_chain(&SlotFinder::default(), &jobs, dt(8, 0), None, |r: &str| {
            Err(SchedulerError::UnknownResource(r.to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownResource(r) if r == "ghost"));
    }

    #[test]
    fn test_default_duration_applies() {
        let jobs = vec![ChainJob {
            job_id: "op1".to_string(),
            resource_id: "cut".to_string(),
            duration: None,
            deadline: None,
        }];
        let placed =
            schedule_chain(&SlotFinder::default(), &jobs, dt(8, 0), None, loader(vec![])).unwrap();
        assert_eq!(placed[0].interval, iv(dt(8, 0), dt(9, 0)));
    }
}
