//! HTTP middleware for the API server
//!
//! Authentication lives in `taskdeck_shared::auth::middleware`; this module
//! holds response-shaping layers that are specific to the server.

pub mod security;
