use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::config::CycleConfig;
use crate::error::{Error, Result};
use crate::models::Task;

/// The date span shared by the current batch of regular tasks.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CycleBounds {
    /// A cycle stays open through its last day.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.end >= today
    }

    pub fn days_left(&self, today: NaiveDate) -> i64 {
        (self.end - today).num_days()
    }
}

/// Computes the span over all regular tasks, or `None` if there are none.
///
/// Unlike [`active_bounds`] this does not hide an expired cycle.
pub fn bounds_of(tasks: &[Task]) -> Option<CycleBounds> {
    let mut regular = tasks.iter().filter(|t| !t.is_resolution());
    let first = regular.next()?;
    let init = CycleBounds {
        start: first.start_date,
        end: first.end_date,
    };
    Some(regular.fold(init, |b, t| CycleBounds {
        start: b.start.min(t.start_date),
        end: b.end.max(t.end_date),
    }))
}

/// The current cycle, or `None` if there are no regular tasks or the
/// latest end date is already in the past.
pub fn active_bounds(tasks: &[Task], today: NaiveDate) -> Option<CycleBounds> {
    bounds_of(tasks).filter(|b| b.is_active(today))
}

/// A regular task whose last day has passed is locked against edits.
pub fn is_expired(task: &Task, today: NaiveDate) -> bool {
    task.end_date < today
}

/// Refuses moving a regular task's end date off the active cycle's end
/// while `enforce_end_date` is set. Unchanged or matching ends pass.
pub fn ensure_cycle_end(
    task: &Task,
    new_end: Option<NaiveDate>,
    active: Option<CycleBounds>,
    config: &CycleConfig,
) -> Result<()> {
    let (Some(end), Some(c)) = (new_end, active) else {
        return Ok(());
    };
    if task.is_resolution() || !config.enforce_end_date || end == task.end_date || end == c.end {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "active cycle ends {}; task {} cannot move its end date to {}",
        c.end, task.id, end
    )))
}

/// Refuses edits to an expired regular task.
pub fn ensure_editable(task: &Task, today: NaiveDate) -> Result<()> {
    if !task.is_resolution() && is_expired(task, today) {
        tracing::warn!(task_id = task.id, end = %task.end_date, "refusing edit of expired task");
        return Err(Error::Locked(format!(
            "task {} ended on {} and is locked",
            task.id, task.end_date
        )));
    }
    Ok(())
}

/// Resolves the date range of a new regular task.
///
/// Without an active cycle the task starts a new one: `end` defaults to
/// `start + default_length_days - 1`. With an active cycle `end` defaults to
/// the cycle's end, and a different explicit end is rejected while
/// `enforce_end_date` is set.
pub fn plan_dates(
    active: Option<CycleBounds>,
    start: NaiveDate,
    end: Option<NaiveDate>,
    config: &CycleConfig,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = match (active, end) {
        (None, Some(e)) => e,
        (None, None) => {
            let len = i64::from(config.default_length_days.max(1));
            start
                .checked_add_signed(Duration::days(len - 1))
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "cycle length of {} days runs past the last representable date",
                        config.default_length_days
                    ))
                })?
        }
        (Some(c), None) => c.end,
        (Some(c), Some(e)) => {
            if e != c.end && config.enforce_end_date {
                return Err(Error::Validation(format!(
                    "active cycle ends {}; new tasks must share that end date",
                    c.end
                )));
            }
            e
        }
    };
    if end < start {
        return Err(Error::Validation(
            "end date cannot be before start date".into(),
        ));
    }
    Ok((start, end))
}
