//! Task model
//!
//! Tasks are the leaves of the domain: they belong to exactly one user,
//! optionally to one of that user's projects, and to any number of that
//! user's categories.
//!
//! # Status
//!
//! ```text
//! pending ⇄ in_progress ⇄ completed
//!    ⇅__________________________⇅
//! ```
//!
//! Any transition is allowed and no state is terminal. The stored
//! `is_completed` flag always equals `status == completed`; the store writes
//! both columns together and PostgreSQL enforces it with a CHECK constraint.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
//! CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
//!     title VARCHAR(255) NOT NULL,
//!     description TEXT,
//!     priority task_priority NOT NULL DEFAULT 'medium',
//!     status task_status NOT NULL DEFAULT 'pending',
//!     due_date TIMESTAMPTZ,
//!     progress INTEGER NOT NULL DEFAULT 0,
//!     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE task_categories (
//!     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
//!     category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
//!     PRIMARY KEY (task_id, category_id)
//! );
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::nullable;

/// Task priority
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Canonical task status
///
/// Older clients send `todo` and `in-progress`; both are accepted as
/// aliases and always emitted in canonical form.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet
    #[default]
    #[serde(alias = "todo")]
    Pending,

    /// Being worked on
    #[serde(alias = "in-progress")]
    InProgress,

    /// Done; may be reopened
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Value of the derived `is_completed` flag for this status
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Project this task belongs to (None = unassigned)
    pub project_id: Option<Uuid>,

    /// Attached categories, sorted by id
    pub category_ids: Vec<Uuid>,

    /// Non-blank title
    pub title: String,

    pub description: Option<String>,

    pub priority: TaskPriority,

    pub status: TaskStatus,

    /// When the task is due (UTC)
    pub due_date: Option<DateTime<Utc>>,

    /// Progress percentage, 0-100
    pub progress: i32,

    /// Mirrors `status == completed`
    pub is_completed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task, as received from callers
///
/// Dates stay raw strings here so that a malformed value is reported as a
/// field error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    /// Required; blank titles are rejected by the access layer
    #[serde(default)]
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,

    /// Defaults to `pending`
    pub status: Option<TaskStatus>,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub due_date: Option<String>,

    /// Must reference a project owned by the caller
    pub project_id: Option<Uuid>,

    /// Each must reference a category owned by the caller
    #[serde(default)]
    pub category_ids: Vec<Uuid>,

    /// Defaults to 0
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,
}

/// Partial update of a task
///
/// Absent fields are left untouched. Nullable fields accept an explicit
/// `null` to clear them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    /// Blank titles are rejected by the access layer
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub priority: Option<TaskPriority>,

    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub project_id: Option<Option<Uuid>>,

    /// Replaces the whole set; `[]` detaches every category
    pub category_ids: Option<Vec<Uuid>>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,

    /// Shortcut for toggling completion; must agree with `status` if both are set
    pub is_completed: Option<bool>,
}

/// Query parameters for listing tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// Inclusive lower bound on the due date
    pub start_date: Option<String>,

    /// Inclusive upper bound on the due date; a bare date covers the whole day
    pub end_date: Option<String>,

    /// Only tasks in this project
    pub project_id: Option<Uuid>,
}

/// Validated task data handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub project_id: Option<Uuid>,
    /// Sorted and deduplicated
    pub category_ids: Vec<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub progress: i32,
}

/// Validated field changes handed to the store
///
/// Setting `status` also rewrites `is_completed` in the same statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub project_id: Option<Option<Uuid>>,
    /// Replacement category set, sorted and deduplicated
    pub category_ids: Option<Vec<Uuid>>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    /// Moves a completed task back to `pending` in the same write as the
    /// other changes; other statuses are left alone. Ignored when `status`
    /// is set.
    pub reopen: bool,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub progress: Option<i32>,
}

impl TaskChanges {
    /// Status the task ends up with when it currently has `current`
    pub fn resolve_status(&self, current: TaskStatus) -> TaskStatus {
        match self.status {
            Some(status) => status,
            None if self.reopen && current.is_completed() => TaskStatus::Pending,
            None => current,
        }
    }
}

/// Store-level task filter; all conditions are ANDed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Inclusive lower bound; excludes undated tasks when set
    pub due_from: Option<DateTime<Utc>>,

    /// Inclusive upper bound; excludes undated tasks when set
    pub due_to: Option<DateTime<Utc>>,

    pub project_id: Option<Uuid>,
}

impl TaskFilter {
    /// Filter selecting every task of one project
    pub fn for_project(project_id: Uuid) -> Self {
        Self {
            project_id: Some(project_id),
            ..Default::default()
        }
    }

    /// Whether a task satisfies this filter
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = self.project_id {
            if task.project_id != Some(project_id) {
                return false;
            }
        }

        if self.due_from.is_some() || self.due_to.is_some() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) {
                return false;
            }
            if self.due_to.is_some_and(|to| due > to) {
                return false;
            }
        }

        true
    }
}

/// Canonical listing order: due date ascending, undated last, then creation
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.due_date
            .is_none()
            .cmp(&b.due_date.is_none())
            .then(a.due_date.cmp(&b.due_date))
            .then(a.created_at.cmp(&b.created_at))
    });
}

/// Which end of a date range a bare date stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBoundary {
    /// Midnight at the start of the day
    Start,

    /// Last representable instant of the day
    End,
}

/// Parses a due date or range bound
///
/// Accepts RFC 3339 timestamps (`2024-03-01T09:30:00Z`), naive timestamps
/// interpreted as UTC (`2024-03-01T09:30`, as produced by datetime inputs),
/// and bare dates (`2024-03-01`), which resolve to the given day boundary.
pub fn parse_date(raw: &str, boundary: DayBoundary) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a valid date", raw))?;

    let naive = match boundary {
        DayBoundary::Start => date.and_hms_opt(0, 0, 0),
        DayBoundary::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
    }
    .ok_or_else(|| format!("'{}' is not a valid date", raw))?;

    Ok(Utc.from_utc_datetime(&naive))
}
