use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::ResolutionConfig;
use crate::error::{Error, Result};
use crate::models::{NewTask, Priority, TaskType};

/// The year resolutions are tracked for and the day they lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionWindow {
    pub year: i32,
    pub lock_date: NaiveDate,
}

impl ResolutionWindow {
    /// Resolves the window for `today`, honouring a configured year override.
    pub fn for_today(today: NaiveDate, config: &ResolutionConfig) -> Result<ResolutionWindow> {
        let year = config.year.unwrap_or_else(|| today.year());
        let lock_date = NaiveDate::from_ymd_opt(year, config.lock_month, config.lock_day)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "invalid resolution lock date {}-{}-{}",
                    year, config.lock_month, config.lock_day
                ))
            })?;
        Ok(ResolutionWindow { year, lock_date })
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 1, 1).unwrap_or(self.lock_date)
    }

    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 12, 31).unwrap_or(self.lock_date)
    }

    /// Resolutions can be added or removed through the lock date itself.
    pub fn is_locked(&self, today: NaiveDate) -> bool {
        today > self.lock_date
    }

    pub fn ensure_unlocked(&self, today: NaiveDate) -> Result<()> {
        if self.is_locked(today) {
            return Err(Error::Locked(format!(
                "resolutions for {} were locked on {}",
                self.year, self.lock_date
            )));
        }
        Ok(())
    }

    /// Builds the stored form of a resolution: a year-long, high priority task.
    pub fn new_resolution(&self, name: String, description: Option<String>) -> NewTask {
        NewTask {
            name,
            description,
            priority: Priority::High,
            start_date: self.start(),
            end_date: self.end(),
            task_type: TaskType::Resolution,
            is_daily: false,
        }
    }
}

/// Returned by a successful add so the caller can confirm it right away.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolutionAdded {
    pub id: i64,
    pub name: String,
    pub year: i32,
}
