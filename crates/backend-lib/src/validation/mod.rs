// ============================
// smartfarm-backend/src/validation/mod.rs
// ============================
//! Request field validation.

use regex::Regex;
use smartfarm_common::AccountId;
use std::sync::LazyLock;
use thiserror::Error;

use crate::auth::password::MAX_PASSWORD_LENGTH;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid account id: {0}")]
    InvalidId(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Emails are compared trimmed and lower-cased everywhere
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email and return its normalized form
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail("Email cannot be empty".into()));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email cannot be longer than {MAX_EMAIL_LENGTH} characters"
        )));
    }
    if !EMAIL_REGEX.is_match(&email) {
        return Err(ValidationError::InvalidEmail("Email format is invalid".into()));
    }
    Ok(email)
}

/// Validate a new password against the length policy
pub fn validate_password(password: &str, min_length: usize) -> ValidationResult<()> {
    let len = password.chars().count();
    if len < min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot be longer than {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be blank".into(),
        ));
    }
    Ok(())
}

/// Parse a path segment as an account id
pub fn parse_account_id(raw: &str) -> ValidationResult<AccountId> {
    match raw.trim().parse::<AccountId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidId(raw.to_string())),
    }
}
