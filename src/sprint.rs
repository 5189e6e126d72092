use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Task;

/// Regular tasks sharing one end date, reported together.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sprint {
    /// "Sprint 1", "Sprint 2", ... in end-date order.
    pub label: String,
    pub end_date: NaiveDate,
    /// Mean progress of the members, truncated.
    pub efficiency: u8,
    pub tasks: Vec<Task>,
}

impl Sprint {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn done_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_complete()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.task_count() - self.done_count()
    }
}

/// Groups regular tasks by exact end date, oldest first.
///
/// Resolutions are ignored. Members of a sprint are ordered by id so the
/// result does not depend on the input order.
pub fn group_sprints(tasks: &[Task]) -> Vec<Sprint> {
    let mut groups: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
    for t in tasks.iter().filter(|t| !t.is_resolution()) {
        groups.entry(t.end_date).or_default().push(t.clone());
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, (end_date, mut members))| {
            members.sort_by_key(|t| t.id);
            let sum: u32 = members.iter().map(|t| u32::from(t.progress.percent())).sum();
            let efficiency = (sum / members.len() as u32) as u8;
            Sprint {
                label: format!("Sprint {}", i + 1),
                end_date,
                efficiency,
                tasks: members,
            }
        })
        .collect()
}

/// Unweighted mean of per-sprint efficiencies, truncated.
///
/// A one-task sprint counts as much as a twenty-task sprint.
pub fn average_efficiency(sprints: &[Sprint]) -> u8 {
    if sprints.is_empty() {
        return 0;
    }
    let sum: u32 = sprints.iter().map(|s| u32::from(s.efficiency)).sum();
    (sum / sprints.len() as u32) as u8
}

/// Headline numbers for the analytics view.
#[derive(Serialize, Debug, Clone)]
pub struct SprintReport {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub average_efficiency: u8,
    pub sprints: Vec<Sprint>,
}

impl SprintReport {
    pub fn build(tasks: &[Task]) -> SprintReport {
        let regular: Vec<&Task> = tasks.iter().filter(|t| !t.is_resolution()).collect();
        let sprints = group_sprints(tasks);
        SprintReport {
            total_tasks: regular.len(),
            completed_tasks: regular.iter().filter(|t| t.is_complete()).count(),
            average_efficiency: average_efficiency(&sprints),
            sprints,
        }
    }

    /// The last `n` sprints, oldest first.
    pub fn recent(&self, n: usize) -> &[Sprint] {
        let skip = self.sprints.len().saturating_sub(n);
        &self.sprints[skip..]
    }

    /// The sprint with the latest end date.
    pub fn current(&self) -> Option<&Sprint> {
        self.sprints.last()
    }
}
