//! Ownership-scoped access layer
//!
//! [`Access`] is the only way the HTTP layer touches projects, tasks and
//! categories. A handle is bound to one resolved user id at construction and
//! every operation it offers is scoped to that user:
//!
//! - reads only ever see the owner's rows
//! - a row owned by someone else is reported as `NotFound`, exactly like a
//!   row that does not exist
//! - inputs are validated before anything reaches the store
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taskdeck_shared::access::Access;
//! use taskdeck_shared::models::project::CreateProjectInput;
//! use taskdeck_shared::store::memory::MemoryStore;
//! use uuid::Uuid;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let access = Access::new(Arc::new(MemoryStore::new()), Uuid::new_v4());
//!
//! let project = access
//!     .create_project(CreateProjectInput {
//!         name: "Website".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! assert_eq!(access.list_projects().await?, vec![project]);
//! # Ok(())
//! # }
//! ```

mod categories;
mod projects;
mod tasks;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::store::{Store, StoreError, TASKS_PROJECT_FKEY, TASK_CATEGORIES_CATEGORY_FKEY};

/// One invalid input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears on the wire (camelCase)
    pub field: String,

    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Access layer errors
#[derive(Debug, Error)]
pub enum AccessError {
    /// The entity does not exist or belongs to another user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// One or more input fields failed validation
    #[error("invalid input")]
    InvalidInput(Vec<FieldError>),

    /// A uniqueness rule was violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    pub fn invalid(field: &str, message: &str) -> Self {
        AccessError::InvalidInput(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => AccessError::Conflict(constraint),
            // The project vanished between the ownership check and the write
            StoreError::ForeignKey(constraint) if constraint == TASKS_PROJECT_FKEY => {
                AccessError::invalid("projectId", "Project not found")
            }
            StoreError::ForeignKey(constraint) if constraint == TASK_CATEGORIES_CATEGORY_FKEY => {
                AccessError::invalid("categoryIds", "Category not found")
            }
            other => {
                error!(error = %other, "Store operation failed");
                AccessError::Internal(other.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AccessError {
    fn from(errors: ValidationErrors) -> Self {
        AccessError::InvalidInput(field_errors(&errors))
    }
}

pub type AccessResult<T> = Result<T, AccessError>;

/// Flattens `validator` errors into wire-named field errors, sorted by field
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                FieldError::new(
                    camel_case(field),
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                )
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Rejects a blank required text field; the value is stored as sent
fn required_text(field: &str, label: &str, value: &str) -> AccessResult<String> {
    if value.trim().is_empty() {
        return Err(AccessError::invalid(field, &format!("{} is required", label)));
    }
    Ok(value.to_string())
}

/// Per-user handle onto projects, tasks and categories
#[derive(Clone)]
pub struct Access {
    store: Arc<dyn Store>,
    user_id: Uuid,
}

impl Access {
    /// Binds the store to a resolved user id
    pub fn new(store: Arc<dyn Store>, user_id: Uuid) -> Self {
        Self { store, user_id }
    }

    /// The user every operation is scoped to
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl std::fmt::Debug for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Access")
            .field("backend", &self.store.backend_name())
            .field("user_id", &self.user_id)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct ProgressInput {
        #[validate(range(min = 0, max = 100, message = "out of range"))]
        due_progress: i32,
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("project_id"), "projectId");
        assert_eq!(camel_case("is_completed"), "isCompleted");
        assert_eq!(camel_case("title"), "title");
    }

    #[test]
    fn test_field_errors_use_wire_names() {
        let errors = ProgressInput { due_progress: 101 }.validate().unwrap_err();
        assert_eq!(
            field_errors(&errors),
            vec![FieldError::new("dueProgress", "out of range")]
        );
    }

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("title", "Title", "  hi ").unwrap(), "  hi ");
        assert!(matches!(
            required_text("title", "Title", "   "),
            Err(AccessError::InvalidInput(ref d)) if d[0].field == "title"
        ));
    }

    #[test]
    fn test_store_error_mapping() {
        let err: AccessError = StoreError::ForeignKey(TASKS_PROJECT_FKEY.to_string()).into();
        assert!(matches!(err, AccessError::InvalidInput(ref d) if d[0].field == "projectId"));

        let err: AccessError =
            StoreError::ForeignKey(TASK_CATEGORIES_CATEGORY_FKEY.to_string()).into();
        assert!(matches!(err, AccessError::InvalidInput(ref d) if d[0].field == "categoryIds"));

        let err: AccessError = StoreError::Conflict("users_email_key".to_string()).into();
        assert!(matches!(err, AccessError::Conflict(_)));

        let err: AccessError = StoreError::Backend("down".to_string()).into();
        assert!(matches!(err, AccessError::Internal(_)));
    }
}
