// ============================
// smartfarm-backend/src/lib.rs
// ============================
//! Core of the SmartFarm account server: credential storage, tokens,
//! the auth service and its HTTP surface.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod notify;
pub mod router;
pub mod storage;
pub mod sweep;
pub mod telemetry;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::auth::{AuthService, DefaultAuth, TokenService};
use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, StorageBackend};
use crate::notify::{LogMailer, Mailer, MeteredMailer, RetryingMailer, SmtpMailer};
use crate::storage::{CredentialStore, FlatFileStore, MemoryStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Token verifier used by the auth middleware
    pub tokens: Arc<TokenService>,
    /// Outbound mail, also used directly by the suggestion relay
    pub mailer: Arc<dyn Mailer>,
    /// Settings loaded at startup
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the state from settings: picks the store and mailer backends and
    /// fails when the signing secret is missing or too short.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn CredentialStore> = match settings.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(
                FlatFileStore::open(&settings.storage.path).with_context(|| {
                    format!("opening store at {}", settings.storage.path.display())
                })?,
            ),
        };

        let mailer: Arc<dyn Mailer> = if settings.mail.enabled {
            let smtp = SmtpMailer::from_settings(&settings.mail).context("configuring SMTP")?;
            Arc::new(RetryingMailer::new(
                smtp,
                settings.mail.retry_attempts,
                Duration::from_millis(settings.mail.retry_backoff_ms),
            ))
        } else {
            tracing::warn!("mail delivery disabled, outgoing mails are only logged");
            Arc::new(LogMailer)
        };

        Self::with_parts(settings, store, mailer, Arc::new(SystemClock))
    }

    /// Build the state around explicit collaborators. Every outgoing mail is
    /// counted in the `mail.*` metrics.
    pub fn with_parts(
        settings: Settings,
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = Arc::new(MeteredMailer::new(mailer));
        let tokens = Arc::new(
            TokenService::from_settings(&settings.auth, clock.clone())
                .context("loading token signing key")?,
        );
        let auth = DefaultAuth::new(store, tokens.clone(), mailer.clone(), clock, &settings.auth)
            .context("building auth service")?;

        Ok(Self {
            auth: Arc::new(auth),
            tokens,
            mailer,
            settings: Arc::new(settings),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Secret;
    use crate::notify::RecordingMailer;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.hash_cost = 4;
        settings.storage.backend = StorageBackend::Memory;
        settings
    }

    #[test]
    fn state_requires_secret() {
        let err = match AppState::new(settings()) {
            Ok(_) => panic!("state built without a secret"),
            Err(e) => e,
        };
        assert!(format!("{err:#}").contains("signing"));
    }

    #[test]
    fn state_rejects_short_secret() {
        let mut settings = settings();
        settings.auth.jwt_secret = Some(Secret::new("short"));
        assert!(AppState::new(settings).is_err());
    }

    #[test]
    fn state_builds_with_memory_store() {
        let mut settings = settings();
        settings.auth.jwt_secret = Some(Secret::new("0123456789abcdef0123456789abcdef"));
        let state = AppState::with_parts(
            settings,
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingMailer::new()),
            Arc::new(ManualClock::default()),
        )
        .unwrap();
        assert_eq!(state.settings.auth.hash_cost, 4);
    }

    #[test]
    fn state_opens_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings();
        settings.storage.backend = StorageBackend::File;
        settings.storage.path = dir.path().to_path_buf();
        settings.auth.jwt_secret = Some(Secret::new("0123456789abcdef0123456789abcdef"));
        assert!(AppState::new(settings).is_ok());
    }
}
