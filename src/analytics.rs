//! Task analytics.
//!
//! Everything here is recomputed from a full snapshot on each call; no
//! aggregate is cached or persisted. Functions that depend on the current
//! month take `now` explicitly.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::Result;
use crate::repository::TaskRepository;
use crate::task::{self, Task, TaskPriority, TaskStatus};

/// Entries kept by `recent_activity` unless configured otherwise
pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;

/// Most recent events taken from each kind before merging
const ACTIVITY_PER_KIND: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityCount {
    pub priority: TaskPriority,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub description: String,
    #[serde(with = "task::local_time")]
    pub timestamp: NaiveDateTime,
    pub task_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStats {
    #[serde(with = "task::local_time")]
    pub generated_at: NaiveDateTime,
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: u32,
    pub average_completion_days: Option<f64>,
    pub average_completion: String,
    pub tasks_created_this_month: usize,
    pub tasks_completed_this_month: usize,
    pub statuses: Vec<StatusCount>,
    pub priorities: Vec<PriorityCount>,
    pub recent_activity: Vec<Activity>,
}

pub fn compute(repository: &TaskRepository, now: NaiveDateTime) -> Result<TaskStats> {
    compute_with_limit(repository, now, DEFAULT_ACTIVITY_LIMIT)
}

pub fn compute_with_limit(
    repository: &TaskRepository,
    now: NaiveDateTime,
    activity_limit: usize,
) -> Result<TaskStats> {
    let tasks = repository.list()?;
    Ok(summarize(&tasks, now, activity_limit))
}

/// Every figure of the report, computed from one snapshot
pub fn summarize(tasks: &[Task], now: NaiveDateTime, activity_limit: usize) -> TaskStats {
    let average = average_completion_time(tasks);
    TaskStats {
        generated_at: now,
        total_tasks: tasks.len(),
        pending_tasks: count_by_status(tasks, TaskStatus::Pending),
        in_progress_tasks: count_by_status(tasks, TaskStatus::InProgress),
        completed_tasks: count_by_status(tasks, TaskStatus::Completed),
        completion_rate: completion_rate(tasks),
        average_completion_days: average.map(round2),
        average_completion: format_average_completion(average),
        tasks_created_this_month: tasks_created_this_month(tasks, now),
        tasks_completed_this_month: tasks_completed_this_month(tasks, now),
        statuses: status_distribution(tasks),
        priorities: priority_distribution(tasks),
        recent_activity: recent_activity(tasks, activity_limit),
    }
}

pub fn count_by_status(tasks: &[Task], status: TaskStatus) -> usize {
    tasks.iter().filter(|task| task.status == status).count()
}

pub fn count_by_priority(tasks: &[Task], priority: TaskPriority) -> usize {
    tasks.iter().filter(|task| task.priority == priority).count()
}

/// Counts for every status, in declaration order
pub fn status_distribution(tasks: &[Task]) -> Vec<StatusCount> {
    TaskStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: count_by_status(tasks, status),
        })
        .collect()
}

pub fn priority_distribution(tasks: &[Task]) -> Vec<PriorityCount> {
    TaskPriority::ALL
        .into_iter()
        .map(|priority| PriorityCount {
            priority,
            count: count_by_priority(tasks, priority),
        })
        .collect()
}

/// Percentage of completed tasks, rounded half up; 0 for no tasks
pub fn completion_rate(tasks: &[Task]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = count_by_status(tasks, TaskStatus::Completed);
    ratio_pct(completed as f64, tasks.len() as f64).round() as u32
}

/// Mean whole days from creation to completion over completed tasks
///
/// Partial days are dropped per task before averaging. `None` when no
/// completed task carries a completion time.
pub fn average_completion_time(tasks: &[Task]) -> Option<f64> {
    let days: Vec<i64> = tasks
        .iter()
        .filter(|task| task.is_completed())
        .filter_map(|task| {
            task.completed_at
                .map(|completed_at| (completed_at - task.created_at).num_days())
        })
        .collect();

    if days.is_empty() {
        return None;
    }
    Some(days.iter().sum::<i64>() as f64 / days.len() as f64)
}

pub fn format_average_completion(average: Option<f64>) -> String {
    match average {
        Some(days) => format!("{days:.1} days"),
        None => "N/A".to_string(),
    }
}

/// First instant of the calendar month containing `now`
pub fn start_of_month(now: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(now)
}

pub fn tasks_created_this_month(tasks: &[Task], now: NaiveDateTime) -> usize {
    let start = start_of_month(now);
    tasks.iter().filter(|task| task.created_at >= start).count()
}

pub fn tasks_completed_this_month(tasks: &[Task], now: NaiveDateTime) -> usize {
    let start = start_of_month(now);
    tasks
        .iter()
        .filter(|task| task.is_completed())
        .filter(|task| task.completed_at.is_some_and(|at| at >= start))
        .count()
}

/// Latest creations and completions, newest first
///
/// Takes the five most recent of each kind, merges them and keeps the
/// first `limit`. Equal timestamps keep creations ahead of completions and
/// otherwise collection order.
pub fn recent_activity(tasks: &[Task], limit: usize) -> Vec<Activity> {
    let mut created: Vec<&Task> = tasks.iter().collect();
    created.sort_by(|left, right| right.created_at.cmp(&left.created_at));

    let mut completed: Vec<(&Task, NaiveDateTime)> = tasks
        .iter()
        .filter(|task| task.is_completed())
        .filter_map(|task| task.completed_at.map(|at| (task, at)))
        .collect();
    completed.sort_by(|left, right| right.1.cmp(&left.1));

    let mut activity: Vec<Activity> = created
        .into_iter()
        .take(ACTIVITY_PER_KIND)
        .map(|task| Activity {
            kind: ActivityKind::Created,
            description: format!("Created task: {}", task.title),
            timestamp: task.created_at,
            task_id: task.id,
        })
        .chain(
            completed
                .into_iter()
                .take(ACTIVITY_PER_KIND)
                .map(|(task, at)| Activity {
                    kind: ActivityKind::Completed,
                    description: format!("Completed task: {}", task.title),
                    timestamp: at,
                    task_id: task.id,
                }),
        )
        .collect();

    activity.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    activity.truncate(limit);
    activity
}

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator <= f64::EPSILON {
        0.0
    } else {
        (numerator / denominator) * 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
