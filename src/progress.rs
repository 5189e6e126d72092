use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Computes the derived completion percent of a daily task.
///
/// `floor(completed / total_days * 100)` where `total_days` counts both ends
/// of `[start, end]` and `completed` only counts checked days inside that
/// range. Returns `None` when the range is empty (`end < start`).
pub fn derived_percent(start: NaiveDate, end: NaiveDate, logs: &BTreeMap<NaiveDate, bool>) -> Option<u8> {
    let total_days = (end - start).num_days() + 1;
    if total_days <= 0 {
        return None;
    }
    let completed = logs
        .range(start..=end)
        .filter(|(_, done)| **done)
        .count() as i64;
    // completed <= total_days, so this stays within 0..=100
    Some((completed * 100 / total_days) as u8)
}

/// Log dates that fall outside `[start, end]`.
///
/// These rows stay in storage after a task's range shrinks but no longer
/// count towards its progress.
pub fn orphaned_dates(start: NaiveDate, end: NaiveDate, logs: &BTreeMap<NaiveDate, bool>) -> Vec<NaiveDate> {
    logs.keys()
        .copied()
        .filter(|d| *d < start || *d > end)
        .collect()
}
