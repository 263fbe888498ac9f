// ============================
// smartfarm-backend/src/auth/token.rs
// ============================
//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying a `purpose` tag, so a password reset token is never
//! accepted where a session token is expected and vice versa. Expiry is checked against
//! the injected `Clock` rather than by the JWT library. Nothing is stored server side:
//! a leaked session token stays valid until its `exp`.
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use smartfarm_common::AccountId;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{AuthSettings, ConfigError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token invalid")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Reset,
}

/// Raw claim set as encoded in the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id; reset tokens are redeemed by it
    pub jti: String,
}

/// Identity carried by a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub account_id: AccountId,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// A verified, not yet redeemed, reset token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetClaims {
    pub account_id: AccountId,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Issues and verifies tokens with the server secret
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    reset_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        secret: &[u8],
        session_ttl: Duration,
        reset_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against `clock`
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl,
            reset_ttl,
            clock,
        }
    }

    /// Build from settings; fails when the secret is absent or too short
    pub fn from_settings(settings: &AuthSettings, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let key = settings.signing_key()?;
        Ok(Self::new(
            &key,
            Duration::seconds(settings.session_ttl_secs as i64),
            Duration::seconds(settings.reset_ttl_secs as i64),
            clock,
        ))
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }

    fn issue(
        &self,
        sub: AccountId,
        email: Option<String>,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = Claims {
            sub,
            email,
            purpose,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue a session token for a logged-in account
    pub fn issue_session(&self, account_id: AccountId, email: &str) -> Result<String, TokenError> {
        self.issue(
            account_id,
            Some(email.to_string()),
            TokenPurpose::Session,
            self.session_ttl,
        )
    }

    /// Issue a short-lived password reset token
    pub fn issue_reset(&self, account_id: AccountId) -> Result<String, TokenError> {
        self.issue(account_id, None, TokenPurpose::Reset, self.reset_ttl)
    }

    /// Check signature, purpose and expiry
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        if claims.purpose != purpose {
            return Err(TokenError::Invalid);
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let claims = self.verify(token, TokenPurpose::Session)?;
        let email = claims.email.ok_or(TokenError::Invalid)?;
        Ok(SessionClaims {
            account_id: claims.sub,
            email,
            expires_at: timestamp(claims.exp),
        })
    }

    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, TokenError> {
        let claims = self.verify(token, TokenPurpose::Reset)?;
        Ok(ResetClaims {
            account_id: claims.sub,
            jti: claims.jti,
            expires_at: timestamp(claims.exp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

    fn service(clock: Arc<ManualClock>) -> TokenService {
        TokenService::new(SECRET, Duration::hours(24), Duration::hours(1), clock)
    }

    #[test]
    fn test_session_token_round_trip() {
        let clock = Arc::new(ManualClock::default());
        let tokens = service(clock.clone());

        let token = tokens.issue_session(42, "alice@example.com").unwrap();
        let claims = tokens.verify_session(&token).unwrap();
        assert_eq!(claims.account_id, 42);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.expires_at, clock.now() + Duration::hours(24));
    }

    #[test]
    fn test_session_token_expires() {
        let clock = Arc::new(ManualClock::default());
        let tokens = service(clock.clone());
        let token = tokens.issue_session(1, "a@b.co").unwrap();

        clock.advance(Duration::hours(24) - Duration::seconds(1));
        assert!(tokens.verify_session(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(tokens.verify_session(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_reset_token_lifetime_is_short() {
        let clock = Arc::new(ManualClock::default());
        let tokens = service(clock.clone());
        let token = tokens.issue_reset(9).unwrap();

        let claims = tokens.verify_reset(&token).unwrap();
        assert_eq!(claims.account_id, 9);
        assert!(!claims.jti.is_empty());

        clock.advance(Duration::hours(1));
        assert_eq!(tokens.verify_reset(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_purposes_do_not_cross() {
        let tokens = service(Arc::new(ManualClock::default()));
        let reset = tokens.issue_reset(1).unwrap();
        let session = tokens.issue_session(1, "a@b.co").unwrap();

        assert_eq!(tokens.verify_session(&reset), Err(TokenError::Invalid));
        assert_eq!(tokens.verify_reset(&session), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_and_foreign_tokens_are_invalid() {
        let clock = Arc::new(ManualClock::default());
        let tokens = service(clock.clone());
        assert_eq!(tokens.verify_session("garbage"), Err(TokenError::Invalid));
        assert_eq!(tokens.verify_session(""), Err(TokenError::Invalid));

        let other = TokenService::new(
            b"another-secret-another-secret-12345",
            Duration::hours(24),
            Duration::hours(1),
            clock,
        );
        let foreign = other.issue_session(1, "a@b.co").unwrap();
        assert_eq!(tokens.verify_session(&foreign), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let tokens = service(Arc::new(ManualClock::default()));
        let token = tokens.issue_session(1, "a@b.co").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = tokens.issue_session(2, "evil@b.co").unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let spliced = parts.join(".");
        assert_eq!(tokens.verify_session(&spliced), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = service(Arc::new(ManualClock::default()));
        let a = tokens.issue_reset(1).unwrap();
        let b = tokens.issue_reset(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_settings_requires_secret() {
        let settings = AuthSettings::default();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        assert!(matches!(
            TokenService::from_settings(&settings, clock),
            Err(ConfigError::MissingSecret)
        ));
    }
}
