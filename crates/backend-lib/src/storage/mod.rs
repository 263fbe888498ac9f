// ============================
// smartfarm-backend/src/storage/mod.rs
// ============================
//! Credential store abstraction with in-memory and flat-file backends.
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smartfarm_common::{AccountId, ProfileResponse};
use thiserror::Error;

mod flat_file;
mod memory;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A stored account
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Normalized (trimmed, lower-cased) email
    pub email: String,
    /// scrypt PHC string
    pub password_hash: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Non-secret view of the account
    pub fn profile(&self) -> ProfileResponse {
        ProfileResponse {
            user_id: self.id,
            email: self.email.clone(),
            birth_date: self.birth_date,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("birth_date", &self.birth_date)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Account about to be inserted; the store assigns the id
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Persistence the auth flow needs. Implementations must keep emails unique
/// and report a collision from `insert` as `StoreError::DuplicateEmail`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Returns `false` when no account has this email
    async fn update_hash_by_email(&self, email: &str, hash: &str) -> Result<bool, StoreError>;

    /// Returns `false` when no account has this id
    async fn update_hash_by_id(&self, id: AccountId, hash: &str) -> Result<bool, StoreError>;

    /// Returns `false` when no row was removed
    async fn delete_by_id(&self, id: AccountId) -> Result<bool, StoreError>;
}
