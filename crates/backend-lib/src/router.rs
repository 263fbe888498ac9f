// ============================
// smartfarm-backend/src/router.rs
// ============================
//! The route table.
use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{self, auth, email};
use crate::middleware::require_session;
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/update-user/{id}", put(auth::update_user))
        .route("/delete-user/{id}", delete(auth::delete_user))
        .route("/mypage", get(auth::mypage))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/find-pwd", post(auth::find_password))
        .route("/reset-pwd", post(auth::reset_password))
        .route("/email-verification", post(email::request_verification))
        .route("/email-verification/confirm", post(email::confirm_verification))
        .route("/send-email", post(email::send_suggestion))
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
