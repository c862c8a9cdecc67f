use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{required_text, Access, AccessError, AccessResult};
use crate::models::category::{Category, CreateCategoryInput, NewCategory};

impl Access {
    /// Lists the caller's categories, oldest first
    pub async fn list_categories(&self) -> AccessResult<Vec<Category>> {
        Ok(self.store.list_categories(self.user_id).await?)
    }

    #[instrument(skip(self, input), fields(user_id = %self.user_id))]
    pub async fn create_category(&self, input: CreateCategoryInput) -> AccessResult<Category> {
        input.validate()?;

        let category = NewCategory {
            name: required_text("name", "Name", &input.name)?,
        };

        let category = self.store.create_category(self.user_id, category).await?;
        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Deletes a category, removing it from every task that carries it
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn delete_category(&self, id: Uuid) -> AccessResult<()> {
        if !self.store.delete_category(self.user_id, id).await? {
            return Err(AccessError::NotFound("category"));
        }
        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Every referenced category must belong to the caller
    ///
    /// Returns the ids sorted and deduplicated, ready for the store.
    pub(super) async fn owned_categories(&self, mut ids: Vec<Uuid>) -> AccessResult<Vec<Uuid>> {
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(ids);
        }

        let owned = self.store.list_categories(self.user_id).await?;
        if ids.iter().all(|id| owned.iter().any(|c| c.id == *id)) {
            Ok(ids)
        } else {
            Err(AccessError::invalid("categoryIds", "Category not found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::tests_support::{access_pair, create_input};
    use crate::models::task::{CreateTaskInput, UpdateTaskInput};

    fn named(name: &str) -> CreateCategoryInput {
        CreateCategoryInput {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_categories_are_owner_scoped() {
        let (a, b) = access_pair().await;
        let work = a.create_category(named("Work")).await.unwrap();
        let personal = a.create_category(named("Personal")).await.unwrap();

        assert_eq!(a.list_categories().await.unwrap(), vec![work.clone(), personal]);
        assert!(b.list_categories().await.unwrap().is_empty());
        assert!(matches!(
            b.delete_category(work.id).await,
            Err(AccessError::NotFound("category"))
        ));
        assert_eq!(a.list_categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_category_name_rejected() {
        let (a, _) = access_pair().await;

        let err = a.create_category(named("  ")).await.unwrap_err();
        assert!(matches!(err, AccessError::InvalidInput(ref d) if d[0].field == "name"));
        assert!(a.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_task_categories_assigned_and_replaced() {
        let (a, _) = access_pair().await;
        let work = a.create_category(named("Work")).await.unwrap();
        let health = a.create_category(named("Health")).await.unwrap();

        let task = a
            .create_task(CreateTaskInput {
                category_ids: vec![health.id, work.id, health.id],
                ..create_input("Gym booking")
            })
            .await
            .unwrap();
        let mut both = vec![work.id, health.id];
        both.sort();
        assert_eq!(task.category_ids, both);
        assert_eq!(a.get_task(task.id).await.unwrap().category_ids, both);

        let untouched = a
            .update_task(
                task.id,
                UpdateTaskInput {
                    progress: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(untouched.category_ids, both);

        let replaced = a
            .update_task(
                task.id,
                UpdateTaskInput {
                    category_ids: Some(vec![work.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.category_ids, vec![work.id]);

        a.delete_category(work.id).await.unwrap();
        assert!(a.get_task(task.id).await.unwrap().category_ids.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_category_rejected() {
        let (a, b) = access_pair().await;
        let mine = a.create_category(named("Mine")).await.unwrap();
        let theirs = b.create_category(named("Theirs")).await.unwrap();

        let err = a
            .create_task(CreateTaskInput {
                category_ids: vec![mine.id, theirs.id],
                ..create_input("Sneaky")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidInput(ref d) if d[0].field == "categoryIds"));
        assert!(a.list_tasks(&Default::default()).await.unwrap().is_empty());

        let task = a.create_task(create_input("Plain")).await.unwrap();
        let err = a
            .update_task(
                task.id,
                UpdateTaskInput {
                    category_ids: Some(vec![theirs.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidInput(ref d) if d[0].field == "categoryIds"));
        assert!(a.get_task(task.id).await.unwrap().category_ids.is_empty());
    }
}
