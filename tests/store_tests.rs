use chrono::NaiveDate;
use rusqlite::Connection;
use taskpro::error::Error;
use taskpro::models::{NewTask, Priority, Progress, TaskEdit, TaskType};
use taskpro::storage::Store;
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn temp_store() -> (Store, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("tasks.db")).unwrap();
    (store, dir)
}

fn new_task(name: &str, start: &str, end: &str, daily: bool) -> NewTask {
    NewTask {
        name: name.into(),
        description: None,
        priority: Priority::Medium,
        start_date: date(start),
        end_date: date(end),
        task_type: TaskType::Regular,
        is_daily: daily,
    }
}

#[test]
fn test_add_and_load() {
    let (store, _dir) = temp_store();
    let mut t = new_task("Write report", "2024-01-01", "2024-01-05", false);
    t.description = Some("quarterly".into());
    t.priority = Priority::High;
    let id = store.add_task(&t, date("2023-12-31")).unwrap();

    let tasks = store.load_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    let loaded = &tasks[0];
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.name, "Write report");
    assert_eq!(loaded.description.as_deref(), Some("quarterly"));
    assert_eq!(loaded.priority, Priority::High);
    assert_eq!(loaded.start_date, date("2024-01-01"));
    assert_eq!(loaded.end_date, date("2024-01-05"));
    assert_eq!(loaded.progress, Progress::Manual(0));
    assert_eq!(loaded.task_type, TaskType::Regular);
    assert_eq!(loaded.created_at, date("2023-12-31"));
}

#[test]
fn test_load_tasks_keeps_insertion_order() {
    let (store, _dir) = temp_store();
    let a = store.add_task(&new_task("A", "2024-01-01", "2024-01-09", false), date("2024-01-01")).unwrap();
    let b = store.add_task(&new_task("B", "2024-01-01", "2024-01-02", false), date("2024-01-01")).unwrap();
    let c = store.add_task(&new_task("C", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    let ids: Vec<i64> = store.load_tasks().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![a, b, c]);
}

#[test]
fn test_add_rejects_invalid_task() {
    let (store, _dir) = temp_store();
    let empty = new_task("  ", "2024-01-01", "2024-01-05", false);
    assert!(matches!(store.add_task(&empty, date("2024-01-01")), Err(Error::Validation(_))));

    let backwards = new_task("Backwards", "2024-01-05", "2024-01-01", false);
    assert!(matches!(store.add_task(&backwards, date("2024-01-01")), Err(Error::Validation(_))));

    assert!(store.load_tasks().unwrap().is_empty());
}

#[test]
fn test_update_progress_manual_task() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    store.update_progress(id, 45).unwrap();
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Manual(45));
}

#[test]
fn test_update_progress_rejects_out_of_range() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    store.update_progress(id, 100).unwrap();

    let res = store.update_progress(id, 255);
    assert!(matches!(res, Err(Error::Validation(_))));
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Manual(100));
}

#[test]
fn test_update_progress_missing_task_is_noop() {
    let (store, _dir) = temp_store();
    store.update_progress(42, 50).unwrap();
    assert!(store.load_tasks().unwrap().is_empty());
}

#[test]
fn test_update_progress_refuses_daily_task() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("Stretch", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();
    store.toggle_daily(id, date("2024-01-01"), true).unwrap();

    let res = store.update_progress(id, 90);
    assert!(matches!(res, Err(Error::Validation(_))));
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Derived(20));
}

#[test]
fn test_daily_progress_scenario() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();

    store.toggle_daily(id, date("2024-01-01"), true).unwrap();
    store.toggle_daily(id, date("2024-01-02"), true).unwrap();
    let p = store.toggle_daily(id, date("2024-01-03"), true).unwrap();
    assert_eq!(p, Some(60));
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Derived(60));

    let p = store.toggle_daily(id, date("2024-01-02"), false).unwrap();
    assert_eq!(p, Some(40));
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Derived(40));
}

#[test]
fn test_toggle_same_day_twice_keeps_one_row() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();

    store.toggle_daily(id, date("2024-01-02"), true).unwrap();
    store.toggle_daily(id, date("2024-01-02"), true).unwrap();
    assert_eq!(store.count_daily_logs(id).unwrap(), 1);
    assert_eq!(store.daily_log_rows(id).unwrap().len(), 1);
    assert_eq!(store.load_task(id).unwrap().unwrap().progress.percent(), 20);
}

#[test]
fn test_daily_logs_map() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();
    store.toggle_daily(id, date("2024-01-01"), true).unwrap();
    store.toggle_daily(id, date("2024-01-04"), false).unwrap();

    let logs = store.daily_logs(id).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs.get(&date("2024-01-01")), Some(&true));
    assert_eq!(logs.get(&date("2024-01-04")), Some(&false));
    assert_eq!(logs.get(&date("2024-01-02")), None);
}

#[test]
fn test_toggle_missing_task_writes_nothing() {
    let (store, _dir) = temp_store();
    assert_eq!(store.toggle_daily(7, date("2024-01-01"), true).unwrap(), None);
    assert_eq!(store.count_daily_logs(7).unwrap(), 0);
}

#[test]
fn test_toggle_non_daily_task_keeps_manual_progress() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    store.update_progress(id, 30).unwrap();

    assert_eq!(store.toggle_daily(id, date("2024-01-01"), true).unwrap(), None);
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Manual(30));
}

#[test]
fn test_delete_cascades_daily_logs() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();
    let other = store.add_task(&new_task("B", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();
    store.toggle_daily(id, date("2024-01-01"), true).unwrap();
    store.toggle_daily(id, date("2024-01-02"), true).unwrap();
    store.toggle_daily(other, date("2024-01-01"), true).unwrap();

    assert!(store.delete_task(id).unwrap());
    assert!(store.load_task(id).unwrap().is_none());
    assert_eq!(store.count_daily_logs(id).unwrap(), 0);
    assert_eq!(store.count_daily_logs(other).unwrap(), 1);
}

#[test]
fn test_delete_missing_task_is_noop() {
    let (store, _dir) = temp_store();
    store.add_task(&new_task("A", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    assert!(!store.delete_task(99).unwrap());
    assert_eq!(store.load_tasks().unwrap().len(), 1);
}

#[test]
fn test_active_cycle_bounds() {
    let (store, _dir) = temp_store();
    assert_eq!(store.active_cycle_bounds(date("2024-01-03")).unwrap(), None);

    store.add_task(&new_task("A", "2024-01-02", "2024-01-05", false), date("2024-01-01")).unwrap();
    store.add_task(&new_task("B", "2024-01-01", "2024-01-04", false), date("2024-01-01")).unwrap();
    let mut res = new_task("Resolution", "2023-01-01", "2024-12-31", false);
    res.task_type = TaskType::Resolution;
    store.add_task(&res, date("2024-01-01")).unwrap();

    let bounds = store.active_cycle_bounds(date("2024-01-03")).unwrap().unwrap();
    assert_eq!(bounds.start, date("2024-01-01"));
    assert_eq!(bounds.end, date("2024-01-05"));

    // still open on its last day
    assert!(store.active_cycle_bounds(date("2024-01-05")).unwrap().is_some());
    // expired the day after
    assert_eq!(store.active_cycle_bounds(date("2024-01-06")).unwrap(), None);
}

#[test]
fn test_deleting_only_regular_task_clears_cycle() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    assert!(store.active_cycle_bounds(date("2024-01-02")).unwrap().is_some());
    store.delete_task(id).unwrap();
    assert_eq!(store.active_cycle_bounds(date("2024-01-02")).unwrap(), None);
}

#[test]
fn test_edit_shrinking_range_recomputes_and_keeps_orphans() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();
    store.toggle_daily(id, date("2024-01-01"), true).unwrap();
    store.toggle_daily(id, date("2024-01-05"), true).unwrap();
    assert_eq!(store.load_task(id).unwrap().unwrap().progress.percent(), 40);

    let edit = TaskEdit {
        end_date: Some(date("2024-01-02")),
        ..TaskEdit::default()
    };
    assert!(store.edit_task(id, &edit).unwrap());

    // 1 of 2 days checked; the 01-05 log is kept but not counted
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Derived(50));
    assert_eq!(store.count_daily_logs(id).unwrap(), 2);
}

#[test]
fn test_edit_rejects_backwards_range() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("A", "2024-01-03", "2024-01-05", false), date("2024-01-01")).unwrap();
    let edit = TaskEdit {
        end_date: Some(date("2024-01-01")),
        ..TaskEdit::default()
    };
    assert!(matches!(store.edit_task(id, &edit), Err(Error::Validation(_))));
    assert_eq!(store.load_task(id).unwrap().unwrap().end_date, date("2024-01-05"));
}

#[test]
fn test_edit_missing_task() {
    let (store, _dir) = temp_store();
    let edit = TaskEdit {
        name: Some("New".into()),
        ..TaskEdit::default()
    };
    assert!(!store.edit_task(5, &edit).unwrap());
}

#[test]
fn test_load_resolutions_and_reset() {
    let (store, _dir) = temp_store();
    store.add_task(&new_task("A", "2024-01-01", "2024-01-05", false), date("2024-01-01")).unwrap();
    let mut res = new_task("Read books", "2024-01-01", "2024-12-31", false);
    res.task_type = TaskType::Resolution;
    let rid = store.add_task(&res, date("2024-01-01")).unwrap();

    let resolutions = store.load_resolutions().unwrap();
    assert_eq!(resolutions.len(), 1);
    assert_eq!(resolutions[0].id, rid);
    assert!(resolutions[0].is_resolution());

    store.reset().unwrap();
    assert!(store.load_tasks().unwrap().is_empty());
}

#[test]
fn test_reopen_existing_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.db");
    let id = {
        let store = Store::open(&path).unwrap();
        store.add_task(&new_task("A", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap()
    };
    let store = Store::open(&path).unwrap();
    store.toggle_daily(id, date("2024-01-01"), true).unwrap();
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Derived(20));
}

#[test]
fn test_toggle_rolls_back_log_when_recompute_fails() {
    let (store, _dir) = temp_store();
    let id = store.add_task(&new_task("Stretch", "2024-01-01", "2024-01-05", true), date("2024-01-01")).unwrap();

    let conn = Connection::open(store.path()).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER block_progress BEFORE UPDATE OF progress ON tasks
         BEGIN SELECT RAISE(ABORT, 'progress frozen'); END;",
    )
    .unwrap();
    drop(conn);

    let res = store.toggle_daily(id, date("2024-01-02"), true);
    assert!(matches!(res, Err(Error::Storage(_))));
    assert_eq!(store.count_daily_logs(id).unwrap(), 0);
    assert_eq!(store.load_task(id).unwrap().unwrap().progress, Progress::Derived(0));
}
