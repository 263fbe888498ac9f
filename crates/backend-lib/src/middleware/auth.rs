use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use metrics::counter;

use crate::auth::TokenError;
use crate::metrics::AUTH_REJECTED;
use crate::{error::AppError, AppState};

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthenticated)?
        .to_str()
        .map_err(|_| AppError::Unauthenticated)?;

    let (scheme, token) = value.split_once(' ').ok_or(AppError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthenticated);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthenticated);
    }
    Ok(token)
}

/// Session gate. Verifies the bearer token and stores its `SessionClaims` in the
/// request extensions. Never touches the credential store.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token,
        Err(e) => {
            counter!(AUTH_REJECTED).increment(1);
            return Err(e);
        }
    };

    let claims = match state.tokens.verify_session(token) {
        Ok(claims) => claims,
        Err(e) => {
            counter!(AUTH_REJECTED).increment(1);
            tracing::debug!(error = %e, path = %request.uri().path(), "bearer token rejected");
            let reason = match e {
                TokenError::Expired => "Token expired",
                _ => "Invalid token",
            };
            return Err(AppError::Forbidden(reason.to_string()));
        }
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
