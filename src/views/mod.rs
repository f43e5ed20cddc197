//! Recent / upcoming / per-category projections of a task collection

use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tasks split around a reference instant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskViews {
    /// `date <= now`, most recent first
    pub recent: Vec<Task>,
    /// `date > now`, soonest first
    pub upcoming: Vec<Task>,
}

/// Tasks sharing a category, in collection order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub tasks: Vec<Task>,
}

/// Sort key; unparseable dates sort as the oldest possible instant
fn sort_key(task: &Task) -> DateTime<Utc> {
    task.instant().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Tasks dated at or before `now`, most recent first
pub fn recent(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    let mut past: Vec<Task> = tasks.iter().filter(|t| t.is_past(now)).cloned().collect();
    // sort_by is stable, so equal dates keep their input order
    past.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    past
}

/// Tasks dated after `now`, soonest first
pub fn upcoming(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    let mut future: Vec<Task> = tasks.iter().filter(|t| !t.is_past(now)).cloned().collect();
    future.sort_by_key(sort_key);
    future
}

/// Both views at once
pub fn partition(tasks: &[Task], now: DateTime<Utc>) -> TaskViews {
    TaskViews {
        recent: recent(tasks, now),
        upcoming: upcoming(tasks, now),
    }
}

/// Group by category in first-seen order
pub fn by_category(tasks: &[Task]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for task in tasks {
        match groups.iter_mut().find(|g| g.category == task.category) {
            Some(group) => group.tasks.push(task.clone()),
            None => groups.push(CategoryGroup {
                category: task.category.clone(),
                tasks: vec![task.clone()],
            }),
        }
    }
    groups
}
