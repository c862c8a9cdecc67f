//! PostgreSQL store
//!
//! Every project and task query carries `user_id = $owner` in its WHERE
//! clause, so a row owned by someone else is indistinguishable from a
//! missing one. Partial updates are assembled with [`QueryBuilder`] so that
//! only provided columns are written.
//!
//! Task category links live in `task_categories`. Task writes touch both
//! tables in one transaction and then re-read the task, so the returned row
//! always carries its current `category_ids`.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::db::pool;
use crate::models::category::{Category, NewCategory};
use crate::models::project::{NewProject, Project, ProjectChanges};
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};
use crate::models::user::{CreateUser, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, user_id, name, description, color, created_at, updated_at";

const TASK_COLUMNS: &str = "id, user_id, project_id, \
     ARRAY(SELECT category_id FROM task_categories \
           WHERE task_id = tasks.id ORDER BY category_id) AS category_ids, \
     title, description, priority, status, due_date, progress, is_completed, \
     created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, user_id, name, created_at, updated_at";

async fn fetch_task(conn: &mut PgConnection, id: Uuid) -> StoreResult<Task> {
    let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(task)
}

async fn link_categories(
    conn: &mut PgConnection,
    task_id: Uuid,
    category_ids: &[Uuid],
) -> StoreResult<()> {
    if category_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO task_categories (task_id, category_id)
         SELECT $1, category_id FROM UNNEST($2::uuid[]) AS category_id
         ON CONFLICT DO NOTHING",
    )
    .bind(task_id)
    .bind(category_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await?;

        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_projects(&self, owner: Uuid) -> StoreResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE user_id = $1 ORDER BY created_at ASC, id ASC",
            PROJECT_COLUMNS
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn find_project(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE id = $1 AND user_id = $2",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    #[instrument(skip(self, project))]
    async fn create_project(&self, owner: Uuid, project: NewProject) -> StoreResult<Project> {
        let sql = format!(
            "INSERT INTO projects (user_id, name, description, color)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            PROJECT_COLUMNS
        );

        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(owner)
            .bind(&project.name)
            .bind(&project.description)
            .bind(&project.color)
            .fetch_one(&self.pool)
            .await?;

        debug!(project_id = %project.id, "Project created");
        Ok(project)
    }

    #[instrument(skip(self, changes))]
    async fn update_project(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: ProjectChanges,
    ) -> StoreResult<Option<Project>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(color) = changes.color {
            query.push(", color = ").push_bind(color);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(owner)
            .push(" RETURNING ")
            .push(PROJECT_COLUMNS);

        let project = query
            .build_query_as::<Project>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    #[instrument(skip(self))]
    async fn delete_project(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM projects WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let detached = sqlx::query(
            "UPDATE tasks SET project_id = NULL, updated_at = NOW() WHERE project_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(detached, "Project deleted");
        Ok(Some(detached))
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        query
            .push(TASK_COLUMNS)
            .push(" FROM tasks WHERE user_id = ")
            .push_bind(owner);

        if let Some(project_id) = filter.project_id {
            query.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(from) = filter.due_from {
            query.push(" AND due_date >= ").push_bind(from);
        }
        if let Some(to) = filter.due_to {
            query.push(" AND due_date <= ").push_bind(to);
        }

        query.push(" ORDER BY due_date ASC NULLS LAST, created_at ASC, id ASC");

        let tasks = query
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    #[instrument(skip(self, task))]
    async fn create_task(&self, owner: Uuid, task: NewTask) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO tasks
                (user_id, project_id, title, description, priority, status,
                 due_date, progress, is_completed)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(owner)
        .bind(task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.progress)
        .bind(task.status.is_completed())
        .fetch_one(&mut *tx)
        .await?;

        link_categories(&mut *tx, id, &task.category_ids).await?;
        let task = fetch_task(&mut *tx, id).await?;
        tx.commit().await?;

        debug!(task_id = %task.id, "Task created");
        Ok(task)
    }

    #[instrument(skip(self, changes))]
    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(project_id) = changes.project_id {
            query.push(", project_id = ").push_bind(project_id);
        }
        if let Some(title) = changes.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(priority) = changes.priority {
            query.push(", priority = ").push_bind(priority);
        }
        match changes.status {
            Some(status) => {
                query
                    .push(", status = ")
                    .push_bind(status)
                    .push(", is_completed = ")
                    .push_bind(status.is_completed());
            }
            // Evaluated against the row this UPDATE locks
            None if changes.reopen => {
                query.push(
                    ", status = CASE WHEN status = 'completed' \
                     THEN 'pending'::task_status ELSE status END, \
                     is_completed = FALSE",
                );
            }
            None => {}
        }
        if let Some(due_date) = changes.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(progress) = changes.progress {
            query.push(", progress = ").push_bind(progress);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(owner)
            .push(" RETURNING id");

        let Some(id) = query
            .build_query_scalar::<Uuid>()
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(category_ids) = &changes.category_ids {
            sqlx::query("DELETE FROM task_categories WHERE task_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_categories(&mut *tx, id, category_ids).await?;
        }

        let task = fetch_task(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(Some(task))
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self, owner: Uuid) -> StoreResult<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE user_id = $1 ORDER BY created_at ASC, id ASC",
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    #[instrument(skip(self, category))]
    async fn create_category(
        &self,
        owner: Uuid,
        category: NewCategory,
    ) -> StoreResult<Category> {
        let sql = format!(
            "INSERT INTO categories (user_id, name) VALUES ($1, $2) RETURNING {}",
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(owner)
            .bind(&category.name)
            .fetch_one(&self.pool)
            .await?;

        debug!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Links to tasks go with it through `ON DELETE CASCADE`
    #[instrument(skip(self))]
    async fn delete_category(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
