//! Domain models for TaskDeck
//!
//! This module contains the persisted entities and the input types accepted
//! at the boundary of the access layer.
//!
//! # Models
//!
//! - `user`: User accounts and credentials
//! - `project`: Projects owned by a single user
//! - `task`: Tasks with priority, status, due date and progress
//! - `category`: User-owned labels attached to tasks
//! - `stats`: Dashboard statistics derived from a user's tasks
//!
//! # Example
//!
//! ```
//! use taskdeck_shared::models::task::{CreateTaskInput, TaskPriority};
//!
//! let input = CreateTaskInput {
//!     title: "Design Homepage".to_string(),
//!     priority: Some(TaskPriority::High),
//!     due_date: Some("2024-03-01".to_string()),
//!     ..Default::default()
//! };
//! assert_eq!(input.title, "Design Homepage");
//! ```

pub mod category;
pub mod project;
pub mod stats;
pub mod task;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that distinguishes "absent" from "explicitly null"
///
/// Used with `#[serde(default, deserialize_with = "nullable")]` on
/// `Option<Option<T>>` patch fields: a missing key stays `None`, `null`
/// becomes `Some(None)` and a value becomes `Some(Some(value))`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
