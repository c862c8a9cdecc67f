//! Entity store
//!
//! The [`Store`] trait is the storage contract behind the access layer. It
//! deals in owner-scoped rows only: every project, task and category method
//! takes the owning user id and never returns another user's records.
//!
//! Two backends implement it:
//!
//! - [`postgres::PgStore`]: sqlx over a `PgPool`, used in production
//! - [`memory::MemoryStore`]: an in-process store for development and tests
//!
//! Validation is not the store's job. Inputs arrive as [`NewTask`],
//! [`TaskChanges`] and friends, already checked by
//! [`crate::access`]; the store only enforces referential integrity and
//! reports violations as [`StoreError`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::category::{Category, NewCategory};
use crate::models::project::{NewProject, Project, ProjectChanges};
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};
use crate::models::user::{CreateUser, User};

/// Constraint name reported when an email is already registered
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Constraint name reported when a task references a missing project
pub const TASKS_PROJECT_FKEY: &str = "tasks_project_id_fkey";

/// Constraint name reported when a task references a missing category
pub const TASK_CATEGORIES_CATEGORY_FKEY: &str = "task_categories_category_id_fkey";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint was violated (carries the constraint name)
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign key constraint was violated (carries the constraint name)
    #[error("foreign key constraint violated: {0}")]
    ForeignKey(String),

    /// The backend failed or is unreachable
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return StoreError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKey(constraint);
            }
        }
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage contract shared by all backends
///
/// Ordering guarantees:
/// - projects and categories: creation time ascending
/// - tasks: due date ascending, undated last, then creation time
///
/// Each method is atomic. `delete_project` in particular detaches the
/// project's tasks and removes the project in one transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Creates a user; duplicate email yields `Conflict(USERS_EMAIL_KEY)`
    async fn create_user(&self, user: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up a user by (already normalized) email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list_projects(&self, owner: Uuid) -> StoreResult<Vec<Project>>;

    async fn find_project(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Project>>;

    async fn create_project(&self, owner: Uuid, project: NewProject) -> StoreResult<Project>;

    /// Applies `changes` and bumps `updated_at`; `None` if not found for `owner`
    async fn update_project(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: ProjectChanges,
    ) -> StoreResult<Option<Project>>;

    /// Detaches the project's tasks and deletes it
    ///
    /// Returns the number of detached tasks, or `None` if the project was not
    /// found for `owner`.
    async fn delete_project(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<u64>>;

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    /// Creates a task together with its category links
    ///
    /// A missing project yields `ForeignKey(TASKS_PROJECT_FKEY)` and a missing
    /// category `ForeignKey(TASK_CATEGORIES_CATEGORY_FKEY)`.
    async fn create_task(&self, owner: Uuid, task: NewTask) -> StoreResult<Task>;

    /// Applies `changes` and bumps `updated_at`; `None` if not found for `owner`
    ///
    /// A status change (explicit or through `reopen`) rewrites `is_completed`
    /// in the same write, and a new category set replaces the old links.
    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>>;

    /// Hard-deletes a task; `false` if not found for `owner`
    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn list_categories(&self, owner: Uuid) -> StoreResult<Vec<Category>>;

    async fn create_category(&self, owner: Uuid, category: NewCategory)
        -> StoreResult<Category>;

    /// Deletes a category and detaches it from every task; `false` if not
    /// found for `owner`
    async fn delete_category(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
}
