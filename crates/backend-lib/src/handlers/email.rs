//! Email verification codes and the suggestion-box relay.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use smartfarm_common::{
    ApiMessage, EmailVerificationConfirm, EmailVerificationRequest, SuggestionRequest,
};

use crate::auth::CodeCheck;
use crate::error::AppError;
use crate::notify::templates;
use crate::validation::validate_email;
use crate::AppState;

/// `POST /email-verification`. The code only ever travels by mail.
pub async fn request_verification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailVerificationRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let email = validate_email(&req.email)?;
    state.auth.request_email_verification(&email).await?;
    Ok((StatusCode::OK, Json(ApiMessage::ok("인증 코드가 발송되었습니다."))).into_response())
}

/// `POST /email-verification/confirm`
pub async fn confirm_verification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailVerificationConfirm>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let email = validate_email(&req.email)?;

    let (status, body) = match state.auth.confirm_email_verification(&email, req.code.trim()) {
        CodeCheck::Verified => (StatusCode::OK, ApiMessage::ok("이메일 인증이 완료되었습니다.")),
        CodeCheck::Mismatch => (
            StatusCode::BAD_REQUEST,
            ApiMessage::fail("인증 코드가 일치하지 않습니다."),
        ),
        CodeCheck::Expired | CodeCheck::Missing => (
            StatusCode::BAD_REQUEST,
            ApiMessage::fail("인증 코드가 만료되었거나 존재하지 않습니다."),
        ),
    };
    Ok((status, Json(body)).into_response())
}

/// `POST /send-email`: forwards a suggestion to the site operator
pub async fn send_suggestion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let Some(raw_email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::fail("이메일 주소가 필요합니다.")),
        )
            .into_response());
    };
    let reply_to = validate_email(raw_email)?;

    let mail = templates::suggestion(&req, &reply_to);
    let operator = state.settings.mail.operator();
    state.mailer.send(operator, &mail.subject, &mail.body).await?;

    tracing::info!(category = %req.category, "suggestion relayed to operator");
    Ok((
        StatusCode::OK,
        Json(ApiMessage::ok("건의사항이 성공적으로 전송되었습니다.")),
    )
        .into_response())
}
