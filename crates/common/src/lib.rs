// ================
// common/src/lib.rs
// ================
//! Common request and response bodies
//! used for communication between the SmartFarm web client and the account server.
//! Field names follow the JSON the existing frontend already sends and reads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier type
pub type AccountId = i64;

/// Body of `POST /register`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Optional birth date (`YYYY-MM-DD`)
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

/// Body of `POST /login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public part of an account returned after login
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginData {
    pub user_id: AccountId,
    pub email: String,
}

/// Successful login response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub success: bool,
    pub msg: String,
    /// Session bearer token
    pub token: String,
    pub data: LoginData,
}

/// Body of `POST /find-pwd`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FindPasswordRequest {
    pub email: String,
}

/// Body of `POST /reset-pwd`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetPasswordRequest {
    /// Reset token delivered by email
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Body of `PUT /update-user/:id`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateUserRequest {
    pub email: String,
    pub password: String,
}

/// Response of `GET /mypage`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub user_id: AccountId,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /email-verification`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EmailVerificationRequest {
    pub email: String,
}

/// Body of `POST /email-verification/confirm`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EmailVerificationConfirm {
    pub email: String,
    pub code: String,
}

/// Body of `POST /send-email` (suggestion box)
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SuggestionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Reply address of the sender; required
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub category: String,
}

/// Generic `{success, msg}` reply used by most endpoints
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiMessage {
    pub success: bool,
    pub msg: String,
}

impl ApiMessage {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self { success: true, msg: msg.into() }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self { success: false, msg: msg.into() }
    }
}
