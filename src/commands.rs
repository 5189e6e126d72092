use std::io::{self, Write};

use chrono::{Datelike, Duration, Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::config::Config;
use crate::cycle::{ensure_cycle_end, ensure_editable, is_expired, plan_dates};
use crate::error::{Error, Result};
use crate::models::{parse_date, NewTask, Priority, Task, TaskEdit, TaskType};
use crate::progress::orphaned_dates;
use crate::resolution::{ResolutionAdded, ResolutionWindow};
use crate::sprint::SprintReport;
use crate::storage::Store;

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.map(|d| parse_date(&d)).transpose()
}

fn check_percent(percent: u8) -> Result<()> {
    if percent > 100 {
        return Err(Error::Validation(format!(
            "progress must be between 0 and 100, got {}",
            percent
        )));
    }
    Ok(())
}

/// Regular tasks still running on `today`, High priority first, least
/// progressed first within a priority.
pub fn active_tasks(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    let mut active: Vec<Task> = tasks
        .iter()
        .filter(|t| !t.is_resolution() && !is_expired(t, today))
        .cloned()
        .collect();
    active.sort_by_key(|t| (t.priority, t.progress.percent(), t.id));
    active
}

fn priority_color(p: Priority) -> Color {
    match p {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn efficiency_color(eff: u8) -> Color {
    if eff >= 80 {
        Color::Green
    } else if eff >= 50 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn bar(percent: u8) -> String {
    let filled = usize::from(percent) / 5;
    format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled))
}

/// Adds a regular task to the current cycle, or starts a new cycle.
///
/// `start` defaults to today. `end` defaults to the active cycle's end, or
/// to a fresh cycle of `cycle.default_length_days` days.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    store: &Store,
    config: &Config,
    name: String,
    description: Option<String>,
    priority: Priority,
    start: Option<String>,
    end: Option<String>,
    daily: bool,
    silent: bool,
) -> Result<i64> {
    let today = today();
    let start = parse_opt_date(start)?.unwrap_or(today);
    let end = parse_opt_date(end)?;

    let active = store.active_cycle_bounds(today)?;
    let (start_date, end_date) = plan_dates(active, start, end, &config.cycle)?;

    let task = NewTask {
        name,
        description: description.filter(|d| !d.trim().is_empty()),
        priority,
        start_date,
        end_date,
        task_type: TaskType::Regular,
        is_daily: daily,
    };
    let id = store.add_task(&task, today)?;

    if !silent {
        match active {
            Some(c) => println!("Active cycle: ends {}", c.end),
            None => println!("Starting new cycle: ends {}", end_date),
        }
        println!("Task added (id = {})", id);
    }
    Ok(id)
}

/// Lists regular tasks in a table.
///
/// By default only the active ones (ending today or later) are shown.
pub fn cmd_list(store: &Store, all: bool, json: bool) -> Result<()> {
    let today = today();
    let tasks = store.load_tasks()?;
    let tasks = if all {
        tasks.into_iter().filter(|t| !t.is_resolution()).collect()
    } else {
        active_tasks(&tasks, today)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Start").add_attribute(Attribute::Bold),
            Cell::new("End").add_attribute(Attribute::Bold),
            Cell::new("Time Left").add_attribute(Attribute::Bold),
            Cell::new("Progress").add_attribute(Attribute::Bold),
            Cell::new("Kind").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let days_left = (t.end_date - today).num_days();
        let time_left_str = if days_left < 0 {
            "Expired".to_string()
        } else if days_left == 0 {
            "Today".to_string()
        } else {
            format!("{}d", days_left)
        };
        let kind = if t.is_daily() { "☑ Daily" } else { "Single" };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name),
            Cell::new(t.priority).fg(priority_color(t.priority)),
            Cell::new(t.start_date),
            Cell::new(t.end_date),
            Cell::new(time_left_str).fg(if days_left < 0 { Color::Grey } else { Color::Reset }),
            Cell::new(format!("{}%", t.progress.percent()))
                .fg(if t.is_complete() { Color::Green } else { Color::Reset }),
            Cell::new(kind),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Shows one task, with its checklist if it is a daily task.
pub fn cmd_show(store: &Store, id: i64) -> Result<()> {
    let today = today();
    let task = store.load_task(id)?.ok_or(Error::NotFound(id))?;

    println!("#{} {} ({}%)", task.id, task.name, task.progress.percent());
    if let Some(d) = &task.description {
        println!("  {}", d);
    }
    println!("  Priority: {}", task.priority);
    println!("  Dates:    {} → {} ({} days)", task.start_date, task.end_date, task.total_days());
    if task.is_resolution() {
        println!("  Resolution");
    } else if is_expired(&task, today) {
        println!("  ⚠ This task has expired and is locked.");
    }

    if !task.is_daily() {
        return Ok(());
    }

    let logs = store.daily_logs(id)?;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Day", "Date", "Done"]);
    let mut day = task.start_date;
    while day <= task.end_date {
        let done = logs.get(&day).copied().unwrap_or(false);
        table.add_row(vec![
            Cell::new(day.format("%a, %b %d")),
            Cell::new(day),
            Cell::new(if done { "☑" } else { "☐" }).fg(if done { Color::Green } else { Color::Reset }),
        ]);
        day += Duration::days(1);
    }
    println!("{table}");

    let orphans = orphaned_dates(task.start_date, task.end_date, &logs);
    if !orphans.is_empty() {
        let list: Vec<String> = orphans.iter().map(|d| d.to_string()).collect();
        println!(
            "Note: {} log(s) outside the task range are kept but not counted: {}",
            orphans.len(),
            list.join(", ")
        );
    }
    Ok(())
}

/// Sets the progress of a single-progress task or resolution.
pub fn cmd_progress(store: &Store, id: i64, percent: u8, silent: bool) -> Result<()> {
    check_percent(percent)?;
    let Some(task) = store.load_task(id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(());
    };
    ensure_editable(&task, today())?;
    store.update_progress(id, percent)?;
    if !silent { println!("Task {} progress set to {}%.", id, percent); }
    Ok(())
}

/// Checks or unchecks one day of a daily task. `date` defaults to today.
///
/// Returns the task's recomputed progress.
pub fn cmd_check(store: &Store, id: i64, date: Option<String>, done: bool, silent: bool) -> Result<Option<u8>> {
    let today = today();
    let day = parse_opt_date(date)?.unwrap_or(today);
    let Some(task) = store.load_task(id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(None);
    };
    if !task.is_daily() {
        return Err(Error::Validation(format!(
            "task {} is not a daily checklist; use `progress` instead",
            id
        )));
    }
    ensure_editable(&task, today)?;
    if !task.covers(day) {
        return Err(Error::Validation(format!(
            "{} is outside task {} ({} → {})",
            day, id, task.start_date, task.end_date
        )));
    }

    let percent = store.toggle_daily(id, day, done)?;
    if !silent {
        let mark = if done { "checked" } else { "unchecked" };
        match percent {
            Some(p) => println!("{} {} for task {}. Progress: {}%", day, mark, id, p),
            None => println!("{} {} for task {}.", day, mark, id),
        }
    }
    Ok(percent)
}

/// Edits a task's details or date range.
///
/// A regular task in the active cycle keeps the cycle's end date while
/// `cycle.enforce_end_date` is set.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    store: &Store,
    config: &Config,
    id: i64,
    name: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
    start: Option<String>,
    end: Option<String>,
    silent: bool,
) -> Result<()> {
    let edit = TaskEdit {
        name,
        description,
        priority,
        start_date: parse_opt_date(start)?,
        end_date: parse_opt_date(end)?,
    };
    if edit.is_empty() {
        return Err(Error::Validation("nothing to change".into()));
    }
    let Some(task) = store.load_task(id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(());
    };
    let today = today();
    ensure_editable(&task, today)?;
    ensure_cycle_end(&task, edit.end_date, store.active_cycle_bounds(today)?, &config.cycle)?;

    store.edit_task(id, &edit)?;
    if !silent {
        println!("Task {} updated.", id);
        if task.is_daily() {
            if let Some(updated) = store.load_task(id)? {
                let logs = store.daily_logs(id)?;
                let orphans = orphaned_dates(updated.start_date, updated.end_date, &logs);
                if !orphans.is_empty() {
                    println!(
                        "Note: {} checked day(s) now fall outside the range and no longer count.",
                        orphans.len()
                    );
                }
            }
        }
    }
    Ok(())
}

/// Removes a task and its daily logs.
///
/// Resolutions can only be removed while the resolution window is open.
pub fn cmd_remove(store: &Store, config: &Config, id: i64, silent: bool) -> Result<()> {
    let today = today();
    let Some(task) = store.load_task(id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(());
    };
    if task.is_resolution() {
        ResolutionWindow::for_today(today, &config.resolutions)?.ensure_unlocked(today)?;
    }
    store.delete_task(id)?;
    if !silent { println!("Task {} removed.", id); }
    Ok(())
}

/// Prints the state of the current cycle.
pub fn cmd_cycle(store: &Store, config: &Config) -> Result<()> {
    let today = today();
    match store.active_cycle_bounds(today)? {
        Some(c) => {
            println!("🔒 Active cycle: {} → {}", c.start, c.end);
            match c.days_left(today) {
                0 => println!("Ends today."),
                n => println!("{} day(s) left.", n),
            }
            let active = active_tasks(&store.load_tasks()?, today);
            let done = active.iter().filter(|t| t.is_complete()).count();
            println!("{} active task(s), {} complete.", active.len(), done);
        }
        None => {
            println!(
                "✨ No active cycle. The next task starts a new one ({} days by default).",
                config.cycle.default_length_days
            );
        }
    }
    Ok(())
}

/// Prints sprint analytics: headline metrics, recent efficiency, the
/// current sprint's status, and per-sprint details.
pub fn cmd_sprints(store: &Store, config: &Config, json: bool) -> Result<()> {
    let tasks = store.load_tasks()?;
    let report = SprintReport::build(&tasks);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.sprints.is_empty() {
        println!("No regular tasks found.");
        return Ok(());
    }

    let mut metrics = Table::new();
    metrics
        .load_preset(UTF8_FULL)
        .set_header(vec!["Total Tasks", "Completed Tasks", "Avg Sprint Efficiency"])
        .add_row(vec![
            Cell::new(report.total_tasks),
            Cell::new(report.completed_tasks),
            Cell::new(format!("{}%", report.average_efficiency))
                .fg(efficiency_color(report.average_efficiency)),
        ]);
    println!("{metrics}");

    let recent = report.recent(config.analytics.recent_sprints);
    println!("Efficiency (last {} sprints)", recent.len());
    for s in recent {
        println!("  {:<10} {} {:>3}%", s.label, bar(s.efficiency), s.efficiency);
    }

    if let Some(current) = report.current() {
        println!(
            "Current sprint: {} │ ✅ {} completed │ ⏳ {} pending",
            current.label,
            current.done_count(),
            current.pending_count()
        );
    }

    let mut details = Table::new();
    details
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Sprint").add_attribute(Attribute::Bold),
            Cell::new("Ends").add_attribute(Attribute::Bold),
            Cell::new("Efficiency").add_attribute(Attribute::Bold),
            Cell::new("Tasks").add_attribute(Attribute::Bold),
            Cell::new("Members").add_attribute(Attribute::Bold),
        ]);
    for s in report.sprints.iter().rev() {
        let members: Vec<String> = s
            .tasks
            .iter()
            .map(|t| format!("{} ({}%)", t.name, t.progress.percent()))
            .collect();
        details.add_row(vec![
            Cell::new(&s.label),
            Cell::new(s.end_date),
            Cell::new(format!("{}%", s.efficiency)).fg(efficiency_color(s.efficiency)),
            Cell::new(s.task_count()),
            Cell::new(members.join("\n")),
        ]);
    }
    println!("{details}");
    Ok(())
}

/// Renders a month grid with the regular tasks running on each day.
///
/// `month` is `YYYY-MM`; defaults to the current month.
pub fn cmd_calendar(store: &Store, month: Option<String>) -> Result<()> {
    let first = match month {
        Some(m) => parse_date(&format!("{}-01", m)).map_err(|_| Error::InvalidDate(m))?,
        None => {
            let t = today();
            t.with_day(1).unwrap_or(t)
        }
    };
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .ok_or_else(|| Error::InvalidDate(first.to_string()))?;

    let tasks: Vec<Task> = store
        .load_tasks()?
        .into_iter()
        .filter(|t| !t.is_resolution())
        .collect();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);

    let lead = first.weekday().num_days_from_monday() as usize;
    let mut week: Vec<Cell> = (0..lead).map(|_| Cell::new("")).collect();
    let mut day = first;
    while day < next_month {
        let mut lines = vec![day.day().to_string()];
        for t in tasks.iter().filter(|t| t.covers(day)) {
            let prefix = if t.is_daily() { "☑ " } else { "" };
            lines.push(format!("{}{} ({}%)", prefix, t.name, t.progress.percent()));
        }
        week.push(Cell::new(lines.join("\n")));
        if week.len() == 7 {
            table.add_row(std::mem::take(&mut week));
        }
        day += Duration::days(1);
    }
    if !week.is_empty() {
        while week.len() < 7 {
            week.push(Cell::new(""));
        }
        table.add_row(week);
    }

    println!("{}", first.format("%B %Y"));
    println!("{table}");
    Ok(())
}

/// Adds a resolution for the configured year.
///
/// The returned value carries what the caller needs to confirm the add.
pub fn cmd_resolution_add(
    store: &Store,
    config: &Config,
    name: String,
    description: Option<String>,
    silent: bool,
) -> Result<ResolutionAdded> {
    let today = today();
    let window = ResolutionWindow::for_today(today, &config.resolutions)?;
    window.ensure_unlocked(today)?;

    let task = window.new_resolution(name, description.filter(|d| !d.trim().is_empty()));
    let id = store.add_task(&task, today)?;
    let added = ResolutionAdded {
        id,
        name: task.name,
        year: window.year,
    };
    if !silent {
        println!("✨ Resolution '{}' for {} added (id = {}).", added.name, added.year, added.id);
    }
    Ok(added)
}

/// Lists resolutions with their progress.
pub fn cmd_resolution_list(store: &Store, config: &Config) -> Result<()> {
    let today = today();
    let window = ResolutionWindow::for_today(today, &config.resolutions)?;
    let resolutions = store.load_resolutions()?;
    if resolutions.is_empty() {
        println!("No resolutions yet.");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["ID", "Goal", "Details", "Year", "Progress"]);
        for r in resolutions {
            table.add_row(vec![
                Cell::new(r.id),
                Cell::new(&r.name),
                Cell::new(r.description.clone().unwrap_or_default()),
                Cell::new(r.start_date.year()),
                Cell::new(format!("{}%", r.progress.percent())),
            ]);
        }
        println!("{table}");
    }
    if window.is_locked(today) {
        println!("🔒 Resolutions for {} are locked (since {}).", window.year, window.lock_date);
    } else {
        println!("Resolutions for {} can be changed until {}.", window.year, window.lock_date);
    }
    Ok(())
}

/// Removes a resolution. Regular task ids are rejected.
pub fn cmd_resolution_remove(store: &Store, config: &Config, id: i64, silent: bool) -> Result<()> {
    match store.load_task(id)? {
        Some(t) if !t.is_resolution() => Err(Error::Validation(format!(
            "task {} is not a resolution",
            id
        ))),
        _ => cmd_remove(store, config, id, silent),
    }
}

/// Sets the progress of a resolution. Regular task ids are rejected.
pub fn cmd_resolution_progress(store: &Store, id: i64, percent: u8, silent: bool) -> Result<()> {
    match store.load_task(id)? {
        Some(t) if !t.is_resolution() => Err(Error::Validation(format!(
            "task {} is not a resolution",
            id
        ))),
        _ => cmd_progress(store, id, percent, silent),
    }
}

/// Resets the database by deleting all tasks and daily logs.
pub fn cmd_reset(store: &Store, force: bool) -> Result<()> {
    if !force {
        print!(
            "Are you sure you want to delete all tasks, resolutions and checklists in {}? This cannot be undone. [y/N] ",
            store.path().display()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.reset()?;
    println!("Database reset successfully.");
    Ok(())
}
