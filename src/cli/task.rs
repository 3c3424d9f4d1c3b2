//! tasktrack task command implementations.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::cli::{load_context, GlobalOptions};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{self, Task, TaskDraft, TaskPriority, TaskStatus};

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub global: GlobalOptions,
}

pub struct EditOptions {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub global: GlobalOptions,
}

pub struct StatusOptions {
    pub id: u64,
    pub status: String,
    /// Name reported in the output envelope (`start`, `complete`, `status`)
    pub command: &'static str,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub id: u64,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub recent: bool,
    pub limit: Option<usize>,
    pub global: GlobalOptions,
}

pub struct RmOptions {
    pub id: u64,
    pub global: GlobalOptions,
}

pub struct ClearOptions {
    pub yes: bool,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct RemovedOutput {
    id: u64,
    removed: bool,
}

#[derive(Serialize)]
struct ClearedOutput {
    removed: usize,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;

    let mut draft = TaskDraft::new(options.title.trim());
    draft.description = normalize_description(options.description);
    if let Some(status) = options.status.as_deref() {
        draft.status = TaskStatus::parse_loose(status)?;
    }
    if let Some(priority) = options.priority.as_deref() {
        draft.priority = TaskPriority::parse_loose(priority)?;
    }
    draft.due_date = options.due.as_deref().map(parse_due).transpose()?;

    let task = ctx.repository.create(draft)?;

    let mut human = HumanOutput::new(format!("Task created: #{}", task.id));
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("tasktrack start {}", task.id));

    emit_success(options.global.output(), "add", &task, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let current = ctx.repository.get(options.id)?;

    let mut patch = TaskDraft::from_task(&current);
    if let Some(title) = options.title {
        patch.title = title.trim().to_string();
    }
    if options.clear_description {
        patch.description = None;
    } else if options.description.is_some() {
        patch.description = normalize_description(options.description);
    }
    if let Some(status) = options.status.as_deref() {
        patch.status = TaskStatus::parse_loose(status)?;
    }
    if let Some(priority) = options.priority.as_deref() {
        patch.priority = TaskPriority::parse_loose(priority)?;
    }
    if options.clear_due {
        patch.due_date = None;
    } else if let Some(due) = options.due.as_deref() {
        patch.due_date = Some(parse_due(due)?);
    }

    let task = ctx.repository.update(options.id, patch)?;

    let mut human = HumanOutput::new(format!("Task updated: #{}", task.id));
    push_task_summary(&mut human, &task);

    emit_success(options.global.output(), "edit", &task, Some(&human))
}

pub fn run_set_status(options: StatusOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let status = TaskStatus::parse_loose(&options.status)?;
    let task = ctx.repository.set_status(options.id, status)?;

    let mut human = HumanOutput::new(format!("Task #{}: {}", task.id, task.status.label()));
    human.push_summary("Title", task.title.clone());
    if let Some(completed_at) = task.completed_at.as_ref() {
        human.push_summary("Completed", format_time(completed_at));
    }

    emit_success(options.global.output(), options.command, &task, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let task = ctx.repository.get(options.id)?;

    let mut human = HumanOutput::new(format!("Task #{}", task.id));
    push_task_summary(&mut human, &task);
    human.push_summary("Created", format_time(&task.created_at));
    human.push_summary("Updated", format_time(&task.updated_at));
    if let Some(completed_at) = task.completed_at.as_ref() {
        human.push_summary("Completed", format_time(completed_at));
    }
    if let Some(description) = task.description.as_ref() {
        human.push_detail(description.clone());
    }

    emit_success(options.global.output(), "show", &task, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let mut tasks = if options.recent {
        ctx.repository.list_recent()?
    } else {
        ctx.repository.list()?
    };

    if let Some(status) = options.status.as_deref() {
        let status = TaskStatus::parse_loose(status)?;
        tasks.retain(|task| task.status == status);
    }
    if let Some(priority) = options.priority.as_deref() {
        let priority = TaskPriority::parse_loose(priority)?;
        tasks.retain(|task| task.priority == priority);
    }
    apply_limit(&mut tasks, options.limit)?;

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step("tasktrack add \"<title>\"");
    }

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(options.global.output(), "list", &output, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let removed = ctx.repository.delete(options.id)?;

    let header = if removed {
        format!("Task deleted: #{}", options.id)
    } else {
        format!("Task #{} not present; nothing to delete", options.id)
    };
    let human = HumanOutput::new(header);
    let output = RemovedOutput {
        id: options.id,
        removed,
    };

    emit_success(options.global.output(), "rm", &output, Some(&human))
}

pub fn run_clear(options: ClearOptions) -> Result<()> {
    if !options.yes {
        return Err(Error::InvalidArgument(
            "refusing to delete every task without --yes".to_string(),
        ));
    }
    let ctx = load_context(&options.global)?;
    let removed = ctx.repository.delete_all()?;

    let mut human = HumanOutput::new("All tasks deleted");
    human.push_summary("Removed", removed.to_string());

    emit_success(
        options.global.output(),
        "clear",
        &ClearedOutput { removed },
        Some(&human),
    )
}

/// Accepts `2024-03-09`, `2024-03-09 17:00` or an ISO-8601 local time
fn parse_due(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Some(value) = task::parse_timestamp(raw) {
        return Ok(value);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Ok(value);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid due date '{raw}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM)"
            ))
        })
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn apply_limit(tasks: &mut Vec<Task>, limit: Option<usize>) -> Result<()> {
    if let Some(limit) = limit {
        if limit == 0 {
            return Err(Error::InvalidArgument("limit must be >= 1".to_string()));
        }
        tasks.truncate(limit);
    }
    Ok(())
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.label());
    human.push_summary("Priority", task.priority.label());
    if let Some(due) = task.due_date.as_ref() {
        human.push_summary("Due", format_time(due));
    }
}

fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "#{} [{}][{}] {}",
        task.id, task.status, task.priority, task.title
    );
    if let Some(due) = task.due_date.as_ref() {
        line.push_str(&format!(" (due {})", format_time(due)));
    }
    line
}

pub(crate) fn format_time(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}
