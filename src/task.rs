//! Task model for tasktrack.
//!
//! A `Task` is the only persisted entity. Status and priority are closed
//! enums serialized by their upper-case names; timestamps are local
//! date-times without an offset (`2024-03-01T09:30:15.250`).

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp layout used in the snapshot and JSON exports
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Accepted on read: writers that drop zero seconds emit `2024-03-01T09:30`
const ISO_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Id carried by records that have not been assigned one yet
pub const UNASSIGNED_ID: u64 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// Wire name, as written to the snapshot and CSV
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Lenient parse for command-line input (`in-progress`, `done`, ...)
    pub fn parse_loose(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "PENDING" | "TODO" | "OPEN" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" | "STARTED" | "ACTIVE" => Ok(TaskStatus::InProgress),
            "COMPLETED" | "DONE" | "CLOSED" => Ok(TaskStatus::Completed),
            _ => Err(Error::InvalidArgument(format!(
                "unknown task status '{value}' (expected pending|in-progress|completed)"
            ))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown status '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }

    pub fn parse_loose(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" | "L" => Ok(TaskPriority::Low),
            "MEDIUM" | "MED" | "M" => Ok(TaskPriority::Medium),
            "HIGH" | "H" => Ok(TaskPriority::High),
            _ => Err(Error::InvalidArgument(format!(
                "unknown task priority '{value}' (expected low|medium|high)"
            ))),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == value)
            .ok_or_else(|| format!("unknown priority '{value}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(with = "local_time")]
    pub created_at: NaiveDateTime,
    #[serde(with = "local_time")]
    pub updated_at: NaiveDateTime,
    #[serde(default, with = "local_time_opt", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default, with = "local_time_opt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    /// Materialize a draft as a freshly created task
    pub fn from_draft(id: u64, draft: TaskDraft, now: NaiveDateTime) -> Self {
        let completed_at = (draft.status == TaskStatus::Completed).then_some(now);
        Self {
            id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            created_at: now,
            updated_at: now,
            due_date: draft.due_date,
            completed_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Overwrite the editable fields from `patch`; id and created_at are kept
    pub fn apply_patch(&mut self, patch: TaskDraft, now: NaiveDateTime) {
        let was_completed = self.is_completed();
        self.title = patch.title;
        self.description = patch.description;
        self.status = patch.status;
        self.priority = patch.priority;
        self.due_date = patch.due_date;
        self.touch(now);
        if self.is_completed() && !was_completed {
            self.completed_at = Some(self.updated_at);
        }
    }

    /// Move to `status`. Completing stamps completed_at; any other target
    /// leaves an earlier completed_at in place.
    pub fn transition(&mut self, status: TaskStatus, now: NaiveDateTime) {
        self.status = status;
        self.touch(now);
        if status == TaskStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
    }

    fn touch(&mut self, now: NaiveDateTime) {
        self.updated_at = advance(self.updated_at, now);
    }

    /// Repair timestamps on records that did not come from this store
    pub fn normalize_imported(&mut self) {
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
    }
}

/// Editable task fields: creation input and update patch alike
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, with = "local_time_opt")]
    pub due_date: Option<NaiveDateTime>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn due(mut self, due_date: NaiveDateTime) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Editable fields of an existing task, as a starting point for edits
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    Ok(())
}

/// Current local wall-clock time
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// `now`, or just past `previous` when the clock has not moved forward
pub fn advance(previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, ISO_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, ISO_MINUTE_FORMAT))
        .ok()
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(ISO_FORMAT).to_string()
}

/// Newest first by creation time; equal timestamps keep collection order
pub fn sort_recent(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}

pub(crate) mod local_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(super::ISO_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

pub(crate) mod local_time_opt {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.collect_str(&value.format(super::ISO_FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => super::parse_timestamp(raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'"))),
        }
    }
}
