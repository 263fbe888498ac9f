// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the SmartFarm account server.

pub mod auth;

pub use auth::{bearer_token, require_session};
