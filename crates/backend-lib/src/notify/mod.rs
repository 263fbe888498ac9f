// ============================
// smartfarm-backend/src/notify/mod.rs
// ============================
//! Outbound email.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;

use crate::metrics::{MAIL_FAILED, MAIL_SENT};

pub mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

impl MailError {
    /// Only transport failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Transport(_))
    }
}

/// Anything that can deliver a plain-text mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

#[async_trait]
impl<M: Mailer + ?Sized> Mailer for Arc<M> {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        (**self).send(to, subject, body).await
    }
}

/// Counts the final outcome of every delivery, whatever mailer sits underneath
#[derive(Debug)]
pub struct MeteredMailer<M> {
    inner: M,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl<M: Mailer> MeteredMailer<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<M: Mailer> Mailer for MeteredMailer<M> {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let result = self.inner.send(to, subject, body).await;
        if result.is_ok() {
            self.sent.fetch_add(1, Ordering::Relaxed);
            counter!(MAIL_SENT).increment(1);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            counter!(MAIL_FAILED).increment(1);
        }
        result
    }
}

/// Mailer used when SMTP is disabled: records the delivery in the log and drops it.
/// The body is never logged since it may carry a reset token.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, body_len = body.len(), "mail delivery disabled, dropping message");
        Ok(())
    }
}

/// Retries transient failures of the wrapped mailer with linear backoff
pub struct RetryingMailer<M> {
    inner: M,
    attempts: u32,
    backoff: Duration,
}

impl<M: Mailer> RetryingMailer<M> {
    pub fn new(inner: M, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

#[async_trait]
impl<M: Mailer> Mailer for RetryingMailer<M> {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let mut attempt = 1;
        loop {
            match self.inner.send(to, subject, body).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    tracing::warn!(to, attempt, error = %e, "mail delivery failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(to, attempt, error = %e, "mail delivery failed");
                    return Err(e);
                }
            }
        }
    }
}

/// A delivered message, as kept by `RecordingMailer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message in memory instead of sending it. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_to(&self, to: &str) -> Option<SentMail> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
