//! Category model
//!
//! Categories are user-owned labels (`Work`, `Shopping`, ...). A task can
//! carry any number of its owner's categories; deleting a category removes
//! it from every task but leaves the tasks alone.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE categories (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     name VARCHAR(255) NOT NULL CHECK (btrim(name) <> ''),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Category model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Non-blank label
    pub name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    /// Required; blank names are rejected by the access layer
    #[serde(default)]
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: String,
}

/// Validated category data handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
}
