//! Authentication primitives for TaskDeck
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing and strength rules
//! - [`jwt`]: HS256 access and refresh tokens
//! - [`middleware`]: Identity resolver and the axum auth middleware
//!
//! # Example
//!
//! ```
//! use taskdeck_shared::auth::password::{hash_password, verify_password};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("Secret123")?;
//! assert!(verify_password("Secret123", &hash)?);
//! assert!(!verify_password("secret123", &hash)?);
//! # Ok(())
//! # }
//! ```

pub mod jwt;
pub mod middleware;
pub mod password;
