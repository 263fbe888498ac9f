use async_trait::async_trait;
use chrono::NaiveDate;
use smartfarm_common::{AccountId, LoginData, ProfileResponse};
use thiserror::Error;

use super::password::PasswordError;
use super::token::TokenError;
use super::verification::CodeCheck;
use crate::notify::MailError;
use crate::storage::StoreError;

/// Infrastructure failures. Expected results such as a wrong password are
/// outcomes, never errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("notification failed: {0}")]
    Notification(#[from] MailError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created { account_id: AccountId },
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { token: String, account: LoginData },
    NotFound,
    InvalidCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    Sent,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetConfirmOutcome {
    Updated,
    /// Expired, forged, wrong-purpose or already redeemed token
    Unauthorized(TokenError),
    /// The token's subject no longer exists
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Found(ProfileResponse),
    NotFound,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
        birth_date: Option<NaiveDate>,
    ) -> Result<RegisterOutcome, AuthError>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError>;

    async fn request_password_reset(&self, email: &str) -> Result<ResetRequestOutcome, AuthError>;

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetConfirmOutcome, AuthError>;

    async fn update_password(&self, email: &str, new_password: &str) -> Result<UpdateOutcome, AuthError>;

    async fn delete_account(&self, account_id: AccountId) -> Result<DeleteOutcome, AuthError>;

    async fn get_profile(&self, account_id: AccountId) -> Result<ProfileOutcome, AuthError>;

    async fn request_email_verification(&self, email: &str) -> Result<(), AuthError>;

    fn confirm_email_verification(&self, email: &str, code: &str) -> CodeCheck;

    /// Forget redeemed reset tokens and verification codes that expired
    fn prune_expired(&self) -> usize;
}
