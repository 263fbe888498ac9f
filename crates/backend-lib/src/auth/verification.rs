//! Six-digit email verification codes.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

use crate::clock::Clock;

/// Wrong guesses allowed before a code is thrown away
pub const MAX_CODE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Verified,
    Mismatch,
    Expired,
    /// No code pending for this address (never issued, used, or discarded)
    Missing,
}

#[derive(Debug)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

/// Pending codes keyed by normalized email. Issuing again replaces the old code.
pub struct VerificationCodes {
    pending: DashMap<String, PendingCode>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl VerificationCodes {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        self.pending.insert(
            email.to_string(),
            PendingCode {
                code: code.clone(),
                expires_at: self.clock.now() + self.ttl,
                attempts: 0,
            },
        );
        code
    }

    /// Check a submitted code. A verified or expired code is consumed, and so
    /// is one that collected `MAX_CODE_ATTEMPTS` wrong guesses.
    pub fn check(&self, email: &str, code: &str) -> CodeCheck {
        let now = self.clock.now();
        let (verdict, discard) = match self.pending.get_mut(email) {
            None => return CodeCheck::Missing,
            Some(mut pending) => {
                if now >= pending.expires_at {
                    (CodeCheck::Expired, true)
                } else if pending.code == code.trim() {
                    (CodeCheck::Verified, true)
                } else {
                    pending.attempts += 1;
                    (CodeCheck::Mismatch, pending.attempts >= MAX_CODE_ATTEMPTS)
                }
            }
        };

        if discard {
            self.pending.remove(email);
        }
        verdict
    }

    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| pending.expires_at > now);
        before - self.pending.len()
    }
}
