//! tasktrack stats and activity commands.

use serde::Serialize;

use crate::analytics::{self, Activity, PriorityCount, StatusCount};
use crate::cli::task::format_time;
use crate::cli::{load_context, GlobalOptions};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task;

pub struct StatsOptions {
    pub global: GlobalOptions,
}

pub struct ActivityOptions {
    pub limit: Option<usize>,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct ActivityOutput {
    total: usize,
    activity: Vec<Activity>,
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let stats = analytics::compute_with_limit(
        &ctx.repository,
        task::now(),
        ctx.config.analytics.recent_activity_limit,
    )?;

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("Total", stats.total_tasks.to_string());
    human.push_summary("Pending", stats.pending_tasks.to_string());
    human.push_summary("In progress", stats.in_progress_tasks.to_string());
    human.push_summary("Completed", stats.completed_tasks.to_string());
    human.push_summary("Completion rate", format!("{}%", stats.completion_rate));
    human.push_summary("Average completion", stats.average_completion.clone());
    human.push_summary(
        "Created this month",
        stats.tasks_created_this_month.to_string(),
    );
    human.push_summary(
        "Completed this month",
        stats.tasks_completed_this_month.to_string(),
    );

    human.push_detail(format!("Statuses: {}", format_status_counts(&stats.statuses)));
    human.push_detail(format!(
        "Priorities: {}",
        format_priority_counts(&stats.priorities)
    ));
    for entry in &stats.recent_activity {
        human.push_detail(format_activity(entry));
    }

    emit_success(options.global.output(), "stats", &stats, Some(&human))
}

pub fn run_activity(options: ActivityOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let limit = match options.limit {
        Some(0) => return Err(Error::InvalidArgument("limit must be >= 1".to_string())),
        Some(limit) => limit,
        None => ctx.config.analytics.recent_activity_limit,
    };

    let tasks = ctx.repository.list()?;
    let activity = analytics::recent_activity(&tasks, limit);

    let mut human = HumanOutput::new("Recent activity");
    for entry in &activity {
        human.push_detail(format_activity(entry));
    }
    if activity.is_empty() {
        human.push_summary("Entries", "none");
    }

    let output = ActivityOutput {
        total: activity.len(),
        activity,
    };
    emit_success(options.global.output(), "activity", &output, Some(&human))
}

fn format_activity(entry: &Activity) -> String {
    format!("{}  {}", format_time(&entry.timestamp), entry.description)
}

fn format_status_counts(counts: &[StatusCount]) -> String {
    counts
        .iter()
        .map(|entry| format!("{}={}", entry.status.label(), entry.count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_priority_counts(counts: &[PriorityCount]) -> String {
    counts
        .iter()
        .map(|entry| format!("{}={}", entry.priority.label(), entry.count))
        .collect::<Vec<_>>()
        .join(", ")
}
