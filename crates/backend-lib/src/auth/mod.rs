// ============================
// smartfarm-backend/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod ledger;
pub mod password;
pub mod token;
pub mod verification;
mod service;
mod service_impl;

pub use ledger::RedeemedTokens;
pub use password::{PasswordError, PasswordHasher, DEFAULT_COST, MAX_PASSWORD_LENGTH};
pub use service::{
    AuthError, AuthService, DeleteOutcome, LoginOutcome, ProfileOutcome, RegisterOutcome,
    ResetConfirmOutcome, ResetRequestOutcome, UpdateOutcome,
};
pub use service_impl::DefaultAuth;
pub use token::{Claims, ResetClaims, SessionClaims, TokenError, TokenPurpose, TokenService};
pub use verification::{CodeCheck, VerificationCodes, MAX_CODE_ATTEMPTS};
