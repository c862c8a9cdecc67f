use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::projects::optional_text;
use super::{field_errors, Access, AccessError, AccessResult, FieldError};
use crate::models::stats::TaskStats;
use crate::models::task::{
    parse_date, CreateTaskInput, DayBoundary, ListTasksQuery, NewTask, Task, TaskChanges,
    TaskFilter, TaskStatus, UpdateTaskInput,
};

fn validation_details(input: &impl Validate) -> Vec<FieldError> {
    input
        .validate()
        .err()
        .map(|errors| field_errors(&errors))
        .unwrap_or_default()
}

/// Parses an optional date field, recording a field error on failure
///
/// Blank strings count as "no date".
fn date_field(
    errors: &mut Vec<FieldError>,
    field: &str,
    raw: Option<&str>,
    boundary: DayBoundary,
) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match parse_date(raw, boundary) {
        Ok(date) => Some(date),
        Err(message) => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

fn title_field(errors: &mut Vec<FieldError>, raw: &str) -> String {
    if raw.trim().is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    }
    raw.to_string()
}

fn reject_if_any(errors: Vec<FieldError>) -> AccessResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AccessError::InvalidInput(errors))
    }
}

impl Access {
    /// Lists the caller's tasks, optionally filtered by due date range and project
    ///
    /// Both date bounds are inclusive and either may be given alone. A bare
    /// `endDate` covers the whole day. Undated tasks never match a date filter.
    pub async fn list_tasks(&self, query: &ListTasksQuery) -> AccessResult<Vec<Task>> {
        let mut errors = Vec::new();
        let due_from = date_field(
            &mut errors,
            "startDate",
            query.start_date.as_deref(),
            DayBoundary::Start,
        );
        let due_to = date_field(
            &mut errors,
            "endDate",
            query.end_date.as_deref(),
            DayBoundary::End,
        );
        if let (Some(from), Some(to)) = (due_from, due_to) {
            if from > to {
                errors.push(FieldError::new(
                    "endDate",
                    "End date must not be before start date",
                ));
            }
        }
        reject_if_any(errors)?;

        let filter = TaskFilter {
            due_from,
            due_to,
            project_id: query.project_id,
        };
        let tasks = self.store.list_tasks(self.user_id, &filter).await?;

        debug!(user_id = %self.user_id, count = tasks.len(), "Tasks listed");
        Ok(tasks)
    }

    pub async fn get_task(&self, id: Uuid) -> AccessResult<Task> {
        self.store
            .find_task(self.user_id, id)
            .await?
            .ok_or(AccessError::NotFound("task"))
    }

    #[instrument(skip(self, input), fields(user_id = %self.user_id))]
    pub async fn create_task(&self, input: CreateTaskInput) -> AccessResult<Task> {
        let mut errors = validation_details(&input);
        let title = title_field(&mut errors, &input.title);
        let due_date = date_field(
            &mut errors,
            "dueDate",
            input.due_date.as_deref(),
            DayBoundary::Start,
        );
        reject_if_any(errors)?;

        if let Some(project_id) = input.project_id {
            self.ensure_project(project_id).await?;
        }
        let category_ids = self.owned_categories(input.category_ids).await?;

        let task = NewTask {
            project_id: input.project_id,
            category_ids,
            title,
            description: optional_text(input.description),
            priority: input.priority.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            due_date,
            progress: input.progress.unwrap_or(0),
        };

        let task = self.store.create_task(self.user_id, task).await?;
        info!(task_id = %task.id, "Task created");
        Ok(task)
    }

    /// Applies the provided fields of a task patch
    ///
    /// `status` and `isCompleted` are kept in sync: a status change rewrites
    /// the flag, and a lone `isCompleted` moves the status to `completed`
    /// (true) or back to `pending` (false, only when currently completed).
    /// The "currently completed" check happens inside the store write, so a
    /// concurrent status change cannot slip in between.
    #[instrument(skip(self, input), fields(user_id = %self.user_id))]
    pub async fn update_task(&self, id: Uuid, input: UpdateTaskInput) -> AccessResult<Task> {
        let mut errors = validation_details(&input);
        let title = input
            .title
            .as_deref()
            .map(|raw| title_field(&mut errors, raw));
        let due_date = input.due_date.as_ref().map(|raw| {
            date_field(&mut errors, "dueDate", raw.as_deref(), DayBoundary::Start)
        });
        if let (Some(status), Some(flag)) = (input.status, input.is_completed) {
            if status.is_completed() != flag {
                errors.push(FieldError::new(
                    "isCompleted",
                    "isCompleted conflicts with status",
                ));
            }
        }
        reject_if_any(errors)?;

        let status = match (input.status, input.is_completed) {
            (Some(status), _) => Some(status),
            (None, Some(true)) => Some(TaskStatus::Completed),
            (None, _) => None,
        };
        let reopen = status.is_none() && input.is_completed == Some(false);

        if let Some(Some(project_id)) = input.project_id {
            self.ensure_project(project_id).await?;
        }
        let category_ids = match input.category_ids {
            Some(ids) => Some(self.owned_categories(ids).await?),
            None => None,
        };

        let changes = TaskChanges {
            project_id: input.project_id,
            category_ids,
            title,
            description: input.description.map(optional_text),
            priority: input.priority,
            status,
            reopen,
            due_date,
            progress: input.progress,
        };

        let task = self
            .store
            .update_task(self.user_id, id, changes)
            .await?
            .ok_or(AccessError::NotFound("task"))?;

        if status.is_some() || reopen {
            info!(task_id = %task.id, status = task.status.as_str(), "Task status updated");
        }
        Ok(task)
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn delete_task(&self, id: Uuid) -> AccessResult<()> {
        if !self.store.delete_task(self.user_id, id).await? {
            return Err(AccessError::NotFound("task"));
        }
        info!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Dashboard statistics over all of the caller's tasks as of `now`
    pub async fn task_stats(&self, now: DateTime<Utc>) -> AccessResult<TaskStats> {
        let tasks = self
            .store
            .list_tasks(self.user_id, &TaskFilter::default())
            .await?;
        Ok(TaskStats::from_tasks(&tasks, now))
    }

    /// A referenced project must exist and belong to the caller
    async fn ensure_project(&self, project_id: Uuid) -> AccessResult<()> {
        match self.store.find_project(self.user_id, project_id).await? {
            Some(_) => Ok(()),
            None => Err(AccessError::invalid("projectId", "Project not found")),
        }
    }
}
