//! HTTP handlers.

pub mod auth;
pub mod email;

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
