//! Account endpoints: register, login, password reset, update, delete, profile.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use smartfarm_common::{
    AccountId, ApiMessage, FindPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, UpdateUserRequest,
};

use crate::auth::{
    DeleteOutcome, LoginOutcome, ProfileOutcome, RegisterOutcome, ResetConfirmOutcome,
    ResetRequestOutcome, SessionClaims, UpdateOutcome,
};
use crate::error::AppError;
use crate::validation::{parse_account_id, validate_email, validate_password};
use crate::AppState;

const MSG_REGISTERED: &str = "회원가입이 완료되었습니다.";
const MSG_EMAIL_TAKEN: &str = "이미 존재하는 이메일 입니다.";
const MSG_LOGIN_OK: &str = "로그인 성공";
const MSG_UNKNOWN_USER: &str = "존재하지 않는 사용자 입니다.";
const MSG_WRONG_PASSWORD: &str = "비밀번호가 일치하지 않습니다.";
const MSG_BAD_CREDENTIALS: &str = "이메일 또는 비밀번호가 일치하지 않습니다.";
const MSG_RESET_SENT: &str = "비밀번호 재설정 이메일을 발송했습니다.";
const MSG_USER_NOT_FOUND: &str = "사용자를 찾을 수 없습니다.";
const MSG_RESET_DONE: &str = "비밀번호가 성공적으로 변경되었습니다.";
const MSG_BAD_TOKEN: &str = "유효하지 않거나 만료된 토큰입니다.";
const MSG_UPDATED: &str = "회원정보가 수정되었습니다.";
const MSG_DELETED: &str = "회원정보 삭제 성공";
const MSG_NO_ACCOUNT: &str = "회원정보가 없습니다.";

fn reply(status: StatusCode, body: ApiMessage) -> Response {
    (status, Json(body)).into_response()
}

/// Path id must name the caller's own account
fn owned_account(raw_id: &str, claims: &SessionClaims) -> Result<AccountId, AppError> {
    let id = parse_account_id(raw_id)?;
    if id != claims.account_id {
        tracing::warn!(path_id = id, account_id = claims.account_id, "cross-account request rejected");
        return Err(AppError::Forbidden("Not allowed for this account".into()));
    }
    Ok(id)
}

/// `POST /register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password, state.settings.auth.min_password_length)?;

    Ok(match state.auth.register(&email, &req.password, req.birth_date).await? {
        RegisterOutcome::Created { .. } => reply(StatusCode::OK, ApiMessage::ok(MSG_REGISTERED)),
        RegisterOutcome::AlreadyExists => reply(StatusCode::OK, ApiMessage::fail(MSG_EMAIL_TAKEN)),
    })
}

/// `POST /login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let email = validate_email(&req.email)?;
    if req.password.is_empty() {
        return Err(AppError::InvalidInput("Password is required".into()));
    }

    let conceal = state.settings.auth.conceal_account_existence;
    Ok(match state.auth.login(&email, &req.password).await? {
        LoginOutcome::Authenticated { token, account } => (
            StatusCode::CREATED,
            Json(LoginResponse {
                success: true,
                msg: MSG_LOGIN_OK.to_string(),
                token,
                data: account,
            }),
        )
            .into_response(),
        LoginOutcome::NotFound => {
            let msg = if conceal { MSG_BAD_CREDENTIALS } else { MSG_UNKNOWN_USER };
            reply(StatusCode::UNAUTHORIZED, ApiMessage::fail(msg))
        }
        LoginOutcome::InvalidCredentials => {
            let msg = if conceal { MSG_BAD_CREDENTIALS } else { MSG_WRONG_PASSWORD };
            reply(StatusCode::UNAUTHORIZED, ApiMessage::fail(msg))
        }
    })
}

/// `POST /find-pwd`
pub async fn find_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FindPasswordRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let email = validate_email(&req.email)?;

    Ok(match state.auth.request_password_reset(&email).await? {
        ResetRequestOutcome::Sent => reply(StatusCode::OK, ApiMessage::ok(MSG_RESET_SENT)),
        ResetRequestOutcome::NotFound if state.settings.auth.conceal_account_existence => {
            reply(StatusCode::OK, ApiMessage::ok(MSG_RESET_SENT))
        }
        ResetRequestOutcome::NotFound => {
            reply(StatusCode::NOT_FOUND, ApiMessage::fail(MSG_USER_NOT_FOUND))
        }
    })
}

/// `POST /reset-pwd`
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    validate_password(&req.new_password, state.settings.auth.min_password_length)?;

    Ok(match state.auth.confirm_password_reset(&req.token, &req.new_password).await? {
        ResetConfirmOutcome::Updated => reply(StatusCode::OK, ApiMessage::ok(MSG_RESET_DONE)),
        ResetConfirmOutcome::Unauthorized(_) => {
            reply(StatusCode::UNAUTHORIZED, ApiMessage::fail(MSG_BAD_TOKEN))
        }
        ResetConfirmOutcome::NotFound => {
            reply(StatusCode::NOT_FOUND, ApiMessage::fail(MSG_USER_NOT_FOUND))
        }
    })
}

/// `PUT /update-user/{id}`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Extension(claims): Extension<SessionClaims>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    owned_account(&raw_id, &claims)?;
    let Json(req) = payload?;
    let email = validate_email(&req.email)?;
    if email != claims.email {
        return Err(AppError::Forbidden("Not allowed for this account".into()));
    }
    validate_password(&req.password, state.settings.auth.min_password_length)?;

    Ok(match state.auth.update_password(&email, &req.password).await? {
        UpdateOutcome::Updated => reply(StatusCode::OK, ApiMessage::ok(MSG_UPDATED)),
        UpdateOutcome::NotFound => reply(StatusCode::NOT_FOUND, ApiMessage::fail(MSG_NO_ACCOUNT)),
    })
}

/// `DELETE /delete-user/{id}`
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Response, AppError> {
    let id = owned_account(&raw_id, &claims)?;

    Ok(match state.auth.delete_account(id).await? {
        DeleteOutcome::Deleted => reply(StatusCode::OK, ApiMessage::ok(MSG_DELETED)),
        DeleteOutcome::NotFound => reply(StatusCode::NOT_FOUND, ApiMessage::fail(MSG_NO_ACCOUNT)),
    })
}

/// `GET /mypage`
pub async fn mypage(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Response, AppError> {
    Ok(match state.auth.get_profile(claims.account_id).await? {
        ProfileOutcome::Found(profile) => (StatusCode::OK, Json(profile)).into_response(),
        ProfileOutcome::NotFound => {
            reply(StatusCode::NOT_FOUND, ApiMessage::fail(MSG_USER_NOT_FOUND))
        }
    })
}
