use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::db_path;
use crate::cycle::CycleBounds;
use crate::error::{Error, Result};
use crate::models::{DailyLog, NewTask, Priority, Progress, Task, TaskEdit, TaskType};
use crate::progress::{derived_percent, orphaned_dates};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        description TEXT,
        priority    TEXT,
        start_date  DATE,
        end_date    DATE,
        progress    INTEGER DEFAULT 0,
        task_type   TEXT,
        is_daily    INTEGER DEFAULT 0,
        created_at  DATE
    );

    CREATE TABLE IF NOT EXISTS daily_logs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id     INTEGER,
        log_date    DATE,
        is_complete INTEGER DEFAULT 0,
        FOREIGN KEY(task_id) REFERENCES tasks(id)
    );";

const SELECT_TASKS: &str = "SELECT id, name, description, priority, start_date, end_date,
        progress, task_type, is_daily, created_at FROM tasks";

/// SQLite-backed record keeper for tasks and their daily logs.
///
/// Every operation opens its own connection and drops it before returning.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Opens the database at `path`, creating the tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %store.path.display(), "opened task store");
        Ok(store)
    }

    /// Opens the database at the configured location (see [`db_path`]).
    pub fn open_default() -> Result<Self> {
        Self::open(db_path())
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Inserts a task and returns its id.
    pub fn add_task(&self, task: &NewTask, created_at: NaiveDate) -> Result<i64> {
        task.validate()?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO tasks (name, description, priority, start_date, end_date,
                                progress, task_type, is_daily, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)",
            params![
                task.name,
                task.description,
                task.priority.as_str(),
                task.start_date,
                task.end_date,
                task.task_type.as_str(),
                task.is_daily,
                created_at,
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, name = %task.name, kind = task.task_type.as_str(), "added task");
        Ok(id)
    }

    /// Loads a single task by its id.
    pub fn load_task(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.connect()?;
        query_task(&conn, id)
    }

    /// Loads every task, regular and resolution, in insertion order.
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_TASKS))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Loads only resolutions, in insertion order.
    pub fn load_resolutions(&self) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE task_type = 'resolution' ORDER BY id",
            SELECT_TASKS
        ))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Sets the progress of a manually tracked task.
    ///
    /// A missing id is a no-op. Values above 100 are refused, and so are
    /// daily tasks: their progress is derived from the checklist.
    pub fn update_progress(&self, id: i64, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(Error::Validation(format!(
                "progress must be between 0 and 100, got {}",
                percent
            )));
        }
        let conn = self.connect()?;
        let Some(task) = query_task(&conn, id)? else {
            tracing::debug!(id, "update_progress on missing task ignored");
            return Ok(());
        };
        if task.is_daily() {
            return Err(Error::Validation(format!(
                "task {} is a daily checklist; its progress is derived from checked days",
                id
            )));
        }
        conn.execute(
            "UPDATE tasks SET progress = ?1 WHERE id = ?2",
            params![percent, id],
        )?;
        tracing::debug!(id, percent, "updated progress");
        Ok(())
    }

    /// Applies `edit` to a task. Returns `false` if the task does not exist.
    ///
    /// Daily tasks get their progress recomputed against the new range in
    /// the same transaction.
    pub fn edit_task(&self, id: i64, edit: &TaskEdit) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let Some(mut task) = query_task(&tx, id)? else {
            return Ok(false);
        };

        if let Some(n) = &edit.name {
            task.name = n.clone();
        }
        if let Some(d) = &edit.description {
            task.description = if d.is_empty() { None } else { Some(d.clone()) };
        }
        if let Some(p) = edit.priority {
            task.priority = p;
        }
        if let Some(s) = edit.start_date {
            task.start_date = s;
        }
        if let Some(e) = edit.end_date {
            task.end_date = e;
        }
        if task.name.trim().is_empty() {
            return Err(Error::Validation("name required".into()));
        }
        if task.end_date < task.start_date {
            return Err(Error::Validation(
                "end date cannot be before start date".into(),
            ));
        }

        tx.execute(
            "UPDATE tasks SET name = ?1, description = ?2, priority = ?3,
                              start_date = ?4, end_date = ?5
             WHERE id = ?6",
            params![
                task.name,
                task.description,
                task.priority.as_str(),
                task.start_date,
                task.end_date,
                id,
            ],
        )?;
        if task.is_daily() {
            recompute_progress(&tx, &task)?;
        }
        tx.commit()?;
        tracing::debug!(id, "edited task");
        Ok(true)
    }

    /// Deletes a task together with its daily logs.
    ///
    /// Returns `false` (and changes nothing) if the id is unknown.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let logs = tx.execute("DELETE FROM daily_logs WHERE task_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::debug!(id, removed, logs, "deleted task");
        Ok(removed > 0)
    }

    /// Records whether `log_date` is done for a task and recomputes its
    /// derived progress, both in one transaction.
    ///
    /// Updates the existing `(task_id, log_date)` row if there is one,
    /// otherwise inserts a new row. Returns the new percent for daily tasks.
    /// An unknown task id writes nothing and returns `None`.
    pub fn toggle_daily(&self, task_id: i64, log_date: NaiveDate, complete: bool) -> Result<Option<u8>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let Some(task) = query_task(&tx, task_id)? else {
            tracing::debug!(task_id, "toggle on missing task ignored");
            return Ok(None);
        };

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM daily_logs WHERE task_id = ?1 AND log_date = ?2",
                params![task_id, log_date],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(log_id) => {
                tx.execute(
                    "UPDATE daily_logs SET is_complete = ?1 WHERE id = ?2",
                    params![complete, log_id],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO daily_logs (task_id, log_date, is_complete) VALUES (?1, ?2, ?3)",
                    params![task_id, log_date, complete],
                )?;
            }
        }

        let percent = if task.is_daily() {
            recompute_progress(&tx, &task)?
        } else {
            None
        };
        tx.commit()?;
        tracing::debug!(task_id, %log_date, complete, ?percent, "toggled daily log");
        Ok(percent)
    }

    /// All stored log rows of a task, oldest date first.
    pub fn daily_log_rows(&self, task_id: i64) -> Result<Vec<DailyLog>> {
        let conn = self.connect()?;
        query_logs(&conn, task_id)
    }

    /// Checked state of each logged day of a task.
    pub fn daily_logs(&self, task_id: i64) -> Result<BTreeMap<NaiveDate, bool>> {
        Ok(self
            .daily_log_rows(task_id)?
            .into_iter()
            .map(|l| (l.log_date, l.is_complete))
            .collect())
    }

    pub fn count_daily_logs(&self, task_id: i64) -> Result<usize> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM daily_logs WHERE task_id = ?1",
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Bounds of the current cycle over regular tasks.
    ///
    /// `None` if there are no regular tasks, or if the latest end date is
    /// strictly before `today`.
    pub fn active_cycle_bounds(&self, today: NaiveDate) -> Result<Option<CycleBounds>> {
        let conn = self.connect()?;
        let (start, end): (Option<NaiveDate>, Option<NaiveDate>) = conn.query_row(
            "SELECT MIN(start_date), MAX(end_date) FROM tasks WHERE task_type != 'resolution'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(match (start, end) {
            (Some(start), Some(end)) => {
                Some(CycleBounds { start, end }).filter(|b| b.is_active(today))
            }
            _ => None,
        })
    }

    /// Deletes every task and daily log.
    pub fn reset(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM daily_logs", [])?;
        tx.execute("DELETE FROM tasks", [])?;
        tx.commit()?;
        tracing::debug!("store reset");
        Ok(())
    }
}

fn query_task(conn: &Connection, id: i64) -> Result<Option<Task>> {
    Ok(conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_TASKS),
            params![id],
            task_from_row,
        )
        .optional()?)
}

fn query_logs(conn: &Connection, task_id: i64) -> Result<Vec<DailyLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, log_date, is_complete FROM daily_logs
         WHERE task_id = ?1 ORDER BY log_date, id",
    )?;
    let logs = stmt
        .query_map(params![task_id], |row| {
            Ok(DailyLog {
                id: row.get(0)?,
                task_id: row.get(1)?,
                log_date: row.get(2)?,
                is_complete: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(logs)
}

/// Rewrites the stored percent of a daily task from its logs.
///
/// Leaves progress untouched for an empty range.
fn recompute_progress(conn: &Connection, task: &Task) -> Result<Option<u8>> {
    let logs: BTreeMap<NaiveDate, bool> = query_logs(conn, task.id)?
        .into_iter()
        .map(|l| (l.log_date, l.is_complete))
        .collect();

    let orphans = orphaned_dates(task.start_date, task.end_date, &logs);
    if !orphans.is_empty() {
        tracing::warn!(
            task_id = task.id,
            count = orphans.len(),
            "daily logs outside the task range are excluded from progress"
        );
    }

    let Some(percent) = derived_percent(task.start_date, task.end_date, &logs) else {
        return Ok(None);
    };
    conn.execute(
        "UPDATE tasks SET progress = ?1 WHERE id = ?2",
        params![percent, task.id],
    )?;
    Ok(Some(percent))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: Option<String> = row.get(3)?;
    let start_date: NaiveDate = row.get(4)?;
    let raw_progress: i64 = row.get::<_, Option<i64>>(6)?.unwrap_or(0);
    let task_type: Option<String> = row.get(7)?;
    let is_daily: bool = row.get::<_, Option<bool>>(8)?.unwrap_or(false);
    let created_at: Option<NaiveDate> = row.get(9)?;

    let percent = raw_progress.clamp(0, 100) as u8;
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        priority: priority
            .and_then(|p| p.parse::<Priority>().ok())
            .unwrap_or(Priority::Medium),
        start_date,
        end_date: row.get(5)?,
        progress: if is_daily {
            Progress::Derived(percent)
        } else {
            Progress::Manual(percent)
        },
        task_type: TaskType::from_db(task_type.as_deref().unwrap_or("regular")),
        created_at: created_at.unwrap_or(start_date),
    })
}
