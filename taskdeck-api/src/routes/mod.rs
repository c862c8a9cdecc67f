//! API route handlers
//!
//! Handlers stay thin: they extract the caller and the request, call the
//! access layer and shape the response. All ownership checks and input
//! validation happen in `taskdeck_shared::access`.

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod projects;
pub mod tasks;

use serde::Deserialize;
use uuid::Uuid;

/// `?id=` query used by DELETE endpoints
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Uuid,
}
