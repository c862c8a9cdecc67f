//! # TaskDeck Shared Library
//!
//! This crate contains the domain types, storage backends, authentication
//! primitives and the ownership-scoped access layer used by the TaskDeck API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Users, projects, tasks and their input types
//! - `auth`: Password hashing, JWT tokens and the identity resolver
//! - `db`: PostgreSQL pool management and migrations
//! - `store`: The `Store` contract with PostgreSQL and in-memory backends
//! - `access`: Per-user access layer enforcing ownership on every operation

pub mod access;
pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the TaskDeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
