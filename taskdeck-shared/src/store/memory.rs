//! In-memory store
//!
//! Keeps all rows in insertion-ordered vectors behind one
//! `tokio::sync::RwLock`. Each write runs inside a single write-lock
//! critical section, which gives the same all-or-nothing behavior as a
//! PostgreSQL transaction. Nothing survives a restart.
//!
//! The store can be switched offline with [`MemoryStore::set_available`] to
//! exercise storage-failure paths in tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    Store, StoreError, StoreResult, TASKS_PROJECT_FKEY, TASK_CATEGORIES_CATEGORY_FKEY,
    USERS_EMAIL_KEY,
};
use crate::models::category::{Category, NewCategory};
use crate::models::project::{NewProject, Project, ProjectChanges};
use crate::models::task::{sort_tasks, NewTask, Task, TaskChanges, TaskFilter};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
}

impl State {
    fn check_project(&self, project_id: Option<Uuid>) -> StoreResult<()> {
        match project_id {
            Some(id) if !self.projects.iter().any(|p| p.id == id) => {
                Err(StoreError::ForeignKey(TASKS_PROJECT_FKEY.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn check_categories(&self, ids: &[Uuid]) -> StoreResult<()> {
        if ids
            .iter()
            .all(|id| self.categories.iter().any(|c| c.id == *id))
        {
            Ok(())
        } else {
            Err(StoreError::ForeignKey(
                TASK_CATEGORIES_CATEGORY_FKEY.to_string(),
            ))
        }
    }
}

/// Category links are kept sorted and unique, matching the SQL backend
fn normalized(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids.dedup();
    ids
}

/// Process-local store for development and tests
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggles simulated availability; while offline every call fails with
    /// `StoreError::Backend`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Backend("memory store is offline".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.ensure_available()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(USERS_EMAIL_KEY.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());

        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_projects(&self, owner: Uuid) -> StoreResult<Vec<Project>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .projects
            .iter()
            .filter(|p| p.user_id == owner)
            .cloned()
            .collect())
    }

    async fn find_project(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Project>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .projects
            .iter()
            .find(|p| p.id == id && p.user_id == owner)
            .cloned())
    }

    async fn create_project(&self, owner: Uuid, project: NewProject) -> StoreResult<Project> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            user_id: owner,
            name: project.name,
            description: project.description,
            color: project.color,
            created_at: now,
            updated_at: now,
        };
        state.projects.push(project.clone());

        debug!(project_id = %project.id, "Project created");
        Ok(project)
    }

    async fn update_project(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: ProjectChanges,
    ) -> StoreResult<Option<Project>> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let Some(project) = state
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.user_id == owner)
        else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            project.name = name;
        }
        if let Some(description) = changes.description {
            project.description = description;
        }
        if let Some(color) = changes.color {
            project.color = color;
        }
        project.updated_at = Utc::now();

        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<u64>> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let Some(index) = state
            .projects
            .iter()
            .position(|p| p.id == id && p.user_id == owner)
        else {
            return Ok(None);
        };

        let now = Utc::now();
        let mut detached = 0;
        for task in state.tasks.iter_mut().filter(|t| t.project_id == Some(id)) {
            task.project_id = None;
            task.updated_at = now;
            detached += 1;
        }
        state.projects.remove(index);

        debug!(detached, "Project deleted");
        Ok(Some(detached))
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        self.ensure_available()?;
        let state = self.state.read().await;

        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.user_id == owner && filter.matches(t))
            .cloned()
            .collect();
        sort_tasks(&mut tasks);

        Ok(tasks)
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id && t.user_id == owner)
            .cloned())
    }

    async fn create_task(&self, owner: Uuid, task: NewTask) -> StoreResult<Task> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        state.check_project(task.project_id)?;
        state.check_categories(&task.category_ids)?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: owner,
            project_id: task.project_id,
            category_ids: normalized(task.category_ids),
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            progress: task.progress,
            is_completed: task.status.is_completed(),
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());

        debug!(task_id = %task.id, "Task created");
        Ok(task)
    }

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        if let Some(project_id) = changes.project_id {
            state.check_project(project_id)?;
        }
        if let Some(category_ids) = &changes.category_ids {
            state.check_categories(category_ids)?;
        }

        let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.user_id == owner)
        else {
            return Ok(None);
        };

        let status = changes.resolve_status(task.status);
        task.status = status;
        task.is_completed = status.is_completed();

        if let Some(project_id) = changes.project_id {
            task.project_id = project_id;
        }
        if let Some(category_ids) = changes.category_ids {
            task.category_ids = normalized(category_ids);
        }
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(progress) = changes.progress {
            task.progress = progress;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let before = state.tasks.len();
        state.tasks.retain(|t| !(t.id == id && t.user_id == owner));
        Ok(state.tasks.len() < before)
    }

    async fn list_categories(&self, owner: Uuid) -> StoreResult<Vec<Category>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .categories
            .iter()
            .filter(|c| c.user_id == owner)
            .cloned()
            .collect())
    }

    async fn create_category(
        &self,
        owner: Uuid,
        category: NewCategory,
    ) -> StoreResult<Category> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            user_id: owner,
            name: category.name,
            created_at: now,
            updated_at: now,
        };
        state.categories.push(category.clone());

        debug!(category_id = %category.id, "Category created");
        Ok(category)
    }

    async fn delete_category(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let Some(index) = state
            .categories
            .iter()
            .position(|c| c.id == id && c.user_id == owner)
        else {
            return Ok(false);
        };

        state.categories.remove(index);
        for task in state.tasks.iter_mut() {
            task.category_ids.retain(|c| *c != id);
        }
        Ok(true)
    }
}
