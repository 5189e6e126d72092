use chrono::{Datelike, Duration};
use taskpro::commands::*;
use taskpro::config::{Config, ResolutionConfig};
use taskpro::error::{exit_codes, Error};
use taskpro::models::{NewTask, Priority, Progress, TaskType};
use taskpro::storage::Store;
use tempfile::TempDir;

fn with_test_db<F>(f: F)
where
    F: FnOnce(&Store),
{
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("taskpro.db")).unwrap();
    f(&store);
}

fn open_resolutions() -> Config {
    let mut config = Config::default();
    config.resolutions = ResolutionConfig {
        year: Some(today().year() + 1),
        ..ResolutionConfig::default()
    };
    config
}

fn locked_resolutions() -> Config {
    let mut config = Config::default();
    config.resolutions = ResolutionConfig {
        year: Some(today().year() - 1),
        ..ResolutionConfig::default()
    };
    config
}

#[test]
fn test_add_starts_new_cycle() {
    with_test_db(|store| {
        let config = Config::default();
        let id = cmd_add(store, &config, "Write report".into(), Some("Q3".into()), Priority::High, None, None, false, true).unwrap();

        let task = store.load_task(id).unwrap().unwrap();
        assert_eq!(task.start_date, today());
        assert_eq!(task.end_date, today() + Duration::days(4));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.progress, Progress::Manual(0));
    });
}

#[test]
fn test_add_joins_active_cycle() {
    with_test_db(|store| {
        let config = Config::default();
        let end = (today() + Duration::days(9)).to_string();
        cmd_add(store, &config, "First".into(), None, Priority::Medium, None, Some(end.clone()), false, true).unwrap();
        let id = cmd_add(store, &config, "Second".into(), None, Priority::Low, None, None, true, true).unwrap();

        let task = store.load_task(id).unwrap().unwrap();
        assert_eq!(task.end_date.to_string(), end);
        assert!(task.is_daily());

        // explicit different end date is refused while the cycle runs
        let other = (today() + Duration::days(3)).to_string();
        let res = cmd_add(store, &config, "Third".into(), None, Priority::Low, None, Some(other), false, true);
        assert!(matches!(res, Err(Error::Validation(_))));
        assert_eq!(store.load_tasks().unwrap().len(), 2);
    });
}

#[test]
fn test_add_validation() {
    with_test_db(|store| {
        let config = Config::default();
        let res = cmd_add(store, &config, "".into(), None, Priority::Medium, None, None, false, true);
        assert!(matches!(res, Err(Error::Validation(_))));

        let res = cmd_add(store, &config, "Bad".into(), None, Priority::Medium, Some("2024-13-01".into()), None, false, true);
        assert!(matches!(res, Err(Error::InvalidDate(_))));
        assert!(store.load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_progress_and_check() {
    with_test_db(|store| {
        let config = Config::default();
        let single = cmd_add(store, &config, "Single".into(), None, Priority::Medium, None, None, false, true).unwrap();
        let daily = cmd_add(store, &config, "Daily".into(), None, Priority::Medium, None, None, true, true).unwrap();

        cmd_progress(store, single, 70, true).unwrap();
        assert_eq!(store.load_task(single).unwrap().unwrap().progress, Progress::Manual(70));

        let p = cmd_check(store, daily, None, true, true).unwrap();
        assert_eq!(p, Some(20));
        let p = cmd_check(store, daily, None, false, true).unwrap();
        assert_eq!(p, Some(0));

        // manual progress on a checklist task is refused
        assert!(matches!(cmd_progress(store, daily, 50, true), Err(Error::Validation(_))));
        // checklist toggles on a single-progress task are refused
        assert!(matches!(cmd_check(store, single, None, true, true), Err(Error::Validation(_))));
        // day outside the task range
        let outside = (today() + Duration::days(30)).to_string();
        assert!(matches!(cmd_check(store, daily, Some(outside), true, true), Err(Error::Validation(_))));
        assert!(matches!(cmd_progress(store, single, 101, true), Err(Error::Validation(_))));
    });
}

#[test]
fn test_missing_ids_are_noops() {
    with_test_db(|store| {
        let config = Config::default();
        cmd_progress(store, 99, 10, true).unwrap();
        assert_eq!(cmd_check(store, 99, None, true, true).unwrap(), None);
        cmd_remove(store, &config, 99, true).unwrap();
        assert!(matches!(cmd_show(store, 99), Err(Error::NotFound(99))));
    });
}

#[test]
fn test_expired_task_is_locked_but_removable() {
    with_test_db(|store| {
        let config = Config::default();
        let start = today() - Duration::days(10);
        let end = today() - Duration::days(6);
        let id = store
            .add_task(
                &NewTask {
                    name: "Old".into(),
                    description: None,
                    priority: Priority::Low,
                    start_date: start,
                    end_date: end,
                    task_type: TaskType::Regular,
                    is_daily: false,
                },
                start,
            )
            .unwrap();

        assert!(matches!(cmd_progress(store, id, 50, true), Err(Error::Locked(_))));
        assert!(store.active_cycle_bounds(today()).unwrap().is_none());

        // an expired cycle lets the next task pick its own dates
        let far = (today() + Duration::days(20)).to_string();
        let new_id = cmd_add(store, &config, "Fresh".into(), None, Priority::Medium, None, Some(far.clone()), false, true).unwrap();
        assert_eq!(store.load_task(new_id).unwrap().unwrap().end_date.to_string(), far);

        cmd_remove(store, &config, id, true).unwrap();
        assert!(store.load_task(id).unwrap().is_none());
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|store| {
        let config = Config::default();
        let id = cmd_add(store, &config, "Draft".into(), None, Priority::Medium, None, None, false, true).unwrap();
        cmd_edit(store, &config, id, Some("Final".into()), Some("notes".into()), Some(Priority::High), None, None, true).unwrap();

        let task = store.load_task(id).unwrap().unwrap();
        assert_eq!(task.name, "Final");
        assert_eq!(task.description.as_deref(), Some("notes"));
        assert_eq!(task.priority, Priority::High);

        let res = cmd_edit(store, &config, id, None, None, None, None, None, true);
        assert!(matches!(res, Err(Error::Validation(_))));
    });
}

#[test]
fn test_edit_keeps_active_cycle_end() {
    with_test_db(|store| {
        let config = Config::default();
        let first = cmd_add(store, &config, "First".into(), None, Priority::Medium, None, None, false, true).unwrap();
        let second = cmd_add(store, &config, "Second".into(), None, Priority::Medium, None, None, false, true).unwrap();
        let cycle_end = today() + Duration::days(4);

        let later = (today() + Duration::days(9)).to_string();
        let res = cmd_edit(store, &config, second, None, None, None, None, Some(later), true);
        assert!(matches!(res, Err(Error::Validation(_))));
        assert_eq!(store.load_task(second).unwrap().unwrap().end_date, cycle_end);

        let tasks = store.load_tasks().unwrap();
        let report = taskpro::sprint::SprintReport::build(&tasks);
        assert_eq!(report.sprints.len(), 1);

        // restating the cycle end is allowed
        cmd_edit(store, &config, first, None, None, None, None, Some(cycle_end.to_string()), true).unwrap();

        let mut loose = Config::default();
        loose.cycle.enforce_end_date = false;
        let later = (today() + Duration::days(9)).to_string();
        cmd_edit(store, &loose, second, None, None, None, None, Some(later), true).unwrap();
        assert_eq!(store.load_task(second).unwrap().unwrap().end_date, today() + Duration::days(9));
    });
}

#[test]
fn test_add_with_oversized_cycle_length_is_rejected() {
    with_test_db(|store| {
        let mut config = Config::default();
        config.cycle.default_length_days = u32::MAX;
        let res = cmd_add(store, &config, "Endless".into(), None, Priority::Medium, None, None, false, true);
        assert!(matches!(res, Err(Error::Validation(_))));
        assert!(store.load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_terminal_failure_maps_to_operation_failed() {
    let err: Error = std::io::Error::other("no terminal").into();
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn test_active_tasks_sorted_by_priority_then_progress() {
    with_test_db(|store| {
        let config = Config::default();
        let low = cmd_add(store, &config, "Low".into(), None, Priority::Low, None, None, false, true).unwrap();
        let high_done = cmd_add(store, &config, "High done".into(), None, Priority::High, None, None, false, true).unwrap();
        let high_new = cmd_add(store, &config, "High new".into(), None, Priority::High, None, None, false, true).unwrap();
        let mid = cmd_add(store, &config, "Mid".into(), None, Priority::Medium, None, None, false, true).unwrap();
        cmd_progress(store, high_done, 90, true).unwrap();
        cmd_progress(store, high_new, 10, true).unwrap();

        let ids: Vec<i64> = active_tasks(&store.load_tasks().unwrap(), today())
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![high_new, high_done, mid, low]);
    });
}

#[test]
fn test_resolution_add_returns_confirmation() {
    with_test_db(|store| {
        let config = open_resolutions();
        let added = cmd_resolution_add(store, &config, "Run a marathon".into(), Some("spring".into()), true).unwrap();
        assert_eq!(added.name, "Run a marathon");
        assert_eq!(added.year, today().year() + 1);

        let res = store.load_task(added.id).unwrap().unwrap();
        assert!(res.is_resolution());
        assert_eq!(res.start_date.year(), today().year() + 1);
        assert_eq!(res.end_date.month(), 12);

        // resolutions do not open a cycle
        assert!(store.active_cycle_bounds(today()).unwrap().is_none());

        cmd_resolution_progress(store, added.id, 30, true).unwrap();
        assert_eq!(store.load_task(added.id).unwrap().unwrap().progress.percent(), 30);

        cmd_resolution_remove(store, &config, added.id, true).unwrap();
        assert!(store.load_resolutions().unwrap().is_empty());
    });
}

#[test]
fn test_locked_resolutions() {
    with_test_db(|store| {
        let open = open_resolutions();
        let added = cmd_resolution_add(store, &open, "Learn Rust".into(), None, true).unwrap();

        let locked = locked_resolutions();
        let res = cmd_resolution_add(store, &locked, "Too late".into(), None, true);
        assert!(matches!(res, Err(Error::Locked(_))));
        assert!(matches!(cmd_remove(store, &locked, added.id, true), Err(Error::Locked(_))));
        assert_eq!(store.load_resolutions().unwrap().len(), 1);

        // progress stays editable after the lock
        cmd_resolution_progress(store, added.id, 55, true).unwrap();
    });
}

#[test]
fn test_resolution_commands_reject_regular_tasks() {
    with_test_db(|store| {
        let config = open_resolutions();
        let id = cmd_add(store, &config, "Regular".into(), None, Priority::Medium, None, None, false, true).unwrap();
        assert!(matches!(cmd_resolution_progress(store, id, 10, true), Err(Error::Validation(_))));
        assert!(matches!(cmd_resolution_remove(store, &config, id, true), Err(Error::Validation(_))));
    });
}
