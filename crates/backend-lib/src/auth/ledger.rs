//! One-time redemption of password reset tokens.
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};

/// Ids (`jti`) of reset tokens that were already used. An entry only has to
/// outlive its token, so anything past its expiry can be pruned.
#[derive(Debug, Default)]
pub struct RedeemedTokens {
    used: DashMap<String, DateTime<Utc>>,
}

impl RedeemedTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `jti`. Returns `false` when it was redeemed before.
    pub fn redeem(&self, jti: &str, expires_at: DateTime<Utc>) -> bool {
        match self.used.entry(jti.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    /// Give a claim back after the password update failed
    pub fn release(&self, jti: &str) {
        self.used.remove(jti);
    }

    /// Drop entries whose token has expired anyway
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.used.len();
        self.used.retain(|_, expires_at| *expires_at > now);
        before - self.used.len()
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
