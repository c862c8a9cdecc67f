use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{required_text, Access, AccessError, AccessResult};
use crate::models::project::{
    CreateProjectInput, NewProject, Project, ProjectChanges, ProjectWithTasks,
    UpdateProjectInput, MAX_COLOR_LEN,
};
use crate::models::task::{Task, TaskFilter};

/// Optional free text; blank becomes `None`, anything else is kept as sent
pub(super) fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn color(value: Option<String>) -> AccessResult<Option<String>> {
    let value = optional_text(value);
    if value.as_ref().is_some_and(|c| c.chars().count() > MAX_COLOR_LEN) {
        return Err(AccessError::invalid(
            "color",
            &format!("Color must be at most {} characters", MAX_COLOR_LEN),
        ));
    }
    Ok(value)
}

impl Access {
    /// Lists the caller's projects, oldest first
    pub async fn list_projects(&self) -> AccessResult<Vec<Project>> {
        Ok(self.store.list_projects(self.user_id).await?)
    }

    /// Lists the caller's projects, each with its tasks in listing order
    pub async fn list_projects_with_tasks(&self) -> AccessResult<Vec<ProjectWithTasks>> {
        let projects = self.store.list_projects(self.user_id).await?;
        let tasks = self
            .store
            .list_tasks(self.user_id, &TaskFilter::default())
            .await?;

        Ok(projects
            .into_iter()
            .map(|project| {
                let tasks: Vec<Task> = tasks
                    .iter()
                    .filter(|t| t.project_id == Some(project.id))
                    .cloned()
                    .collect();
                ProjectWithTasks { project, tasks }
            })
            .collect())
    }

    pub async fn get_project(&self, id: Uuid) -> AccessResult<Project> {
        self.store
            .find_project(self.user_id, id)
            .await?
            .ok_or(AccessError::NotFound("project"))
    }

    /// Project detail view including its tasks
    pub async fn get_project_with_tasks(&self, id: Uuid) -> AccessResult<ProjectWithTasks> {
        let project = self.get_project(id).await?;
        let tasks = self
            .store
            .list_tasks(self.user_id, &TaskFilter::for_project(id))
            .await?;
        Ok(ProjectWithTasks { project, tasks })
    }

    #[instrument(skip(self, input), fields(user_id = %self.user_id))]
    pub async fn create_project(&self, input: CreateProjectInput) -> AccessResult<Project> {
        input.validate()?;

        let project = NewProject {
            name: required_text("name", "Name", &input.name)?,
            description: optional_text(input.description),
            color: color(input.color)?,
        };

        let project = self.store.create_project(self.user_id, project).await?;
        info!(project_id = %project.id, "Project created");
        Ok(project)
    }

    /// Applies the provided fields; `null` clears description or color
    #[instrument(skip(self, input), fields(user_id = %self.user_id))]
    pub async fn update_project(
        &self,
        id: Uuid,
        input: UpdateProjectInput,
    ) -> AccessResult<Project> {
        input.validate()?;

        let changes = ProjectChanges {
            name: input
                .name
                .as_deref()
                .map(|name| required_text("name", "Name", name))
                .transpose()?,
            description: input.description.map(optional_text),
            color: input.color.map(color).transpose()?,
        };

        self.store
            .update_project(self.user_id, id, changes)
            .await?
            .ok_or(AccessError::NotFound("project"))
    }

    /// Deletes a project, detaching (not deleting) its tasks
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn delete_project(&self, id: Uuid) -> AccessResult<()> {
        let detached = self
            .store
            .delete_project(self.user_id, id)
            .await?
            .ok_or(AccessError::NotFound("project"))?;

        info!(project_id = %id, detached, "Project deleted");
        Ok(())
    }
}
