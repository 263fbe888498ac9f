// ============================
// smartfarm-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scrypt::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher as _,
        PasswordVerifier as _, SaltString,
    },
    Params, Scrypt,
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Upper bound on accepted password length
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Default scrypt cost (`log2(N)`)
pub const DEFAULT_COST: u8 = 15;

#[derive(Error, Debug)]
pub enum PasswordError {
    /// The stored hash could not be parsed or uses unsupported parameters
    #[error("stored credential is corrupt")]
    CorruptCredential,

    #[error("hashing failed: {0}")]
    Hash(String),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// scrypt hasher with a fixed cost. Every call draws a fresh salt.
/// Clones share one verification tally.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    verifications: Arc<AtomicU64>,
}

impl PasswordHasher {
    pub fn new(cost: u8) -> Result<Self, PasswordError> {
        let params = Params::new(
            cost,
            Params::RECOMMENDED_R,
            Params::RECOMMENDED_P,
            Params::RECOMMENDED_LEN,
        )
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Self {
            params,
            verifications: Arc::default(),
        })
    }

    /// Number of `verify` calls made through this hasher or its clones
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }

    /// Hash a password using scrypt
    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params.clone(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    /// A mismatch is `Ok(false)`; only an unreadable hash is an error.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::CorruptCredential)?;
        match Scrypt.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(_) => Err(PasswordError::CorruptCredential),
        }
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(&self, plain: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let plain = Zeroizing::new(plain.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&plain)).await?
    }

    /// `verify` on the blocking pool
    pub async fn verify_blocking(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        let plain = Zeroizing::new(plain.to_string());
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
            verifications: Arc::default(),
        }
    }
}
