use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Task priority, ordered from most to least important.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(Error::Validation(format!(
                "unknown priority '{}'. Supported: High, Medium, Low.",
                s
            ))),
        }
    }
}

/// Which track a task belongs to. Both live in the same table.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Regular,
    Resolution,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Regular => "regular",
            TaskType::Resolution => "resolution",
        }
    }

    /// Anything that is not explicitly a resolution counts as regular.
    pub fn from_db(s: &str) -> TaskType {
        if s == "resolution" {
            TaskType::Resolution
        } else {
            TaskType::Regular
        }
    }
}

/// Completion percentage of a task.
///
/// `Manual` values are set directly by the user. `Derived` values are
/// recomputed from the task's daily checklist and cannot be edited by hand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", content = "percent", rename_all = "lowercase")]
pub enum Progress {
    Manual(u8),
    Derived(u8),
}

impl Progress {
    pub fn percent(&self) -> u8 {
        match *self {
            Progress::Manual(p) | Progress::Derived(p) => p,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Progress::Derived(_))
    }
}

/// Represents a single task (regular or resolution).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, assigned by the store.
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub priority: Priority,
    /// First day of the task (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the task (inclusive).
    pub end_date: NaiveDate,
    pub progress: Progress,
    pub task_type: TaskType,
    /// Informational only.
    pub created_at: NaiveDate,
}

impl Task {
    /// Daily tasks carry a checklist and a derived progress.
    pub fn is_daily(&self) -> bool {
        self.progress.is_derived()
    }

    pub fn is_resolution(&self) -> bool {
        self.task_type == TaskType::Resolution
    }

    pub fn is_complete(&self) -> bool {
        self.progress.percent() >= 100
    }

    /// Number of calendar days covered by the task, both ends included.
    pub fn total_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Whether `day` falls inside `[start_date, end_date]`.
    pub fn covers(&self, day: NaiveDate) -> bool {
        day >= self.start_date && day <= self.end_date
    }
}

/// A per-day checklist entry belonging to a daily task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DailyLog {
    pub id: i64,
    pub task_id: i64,
    pub log_date: NaiveDate,
    pub is_complete: bool,
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub task_type: TaskType,
    pub is_daily: bool,
}

impl NewTask {
    /// Checks the two invariants callers own: a non-empty name and `end >= start`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name required".into()));
        }
        if self.end_date < self.start_date {
            return Err(Error::Validation(
                "end date cannot be before start date".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update of a task's descriptive fields and date range.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}
