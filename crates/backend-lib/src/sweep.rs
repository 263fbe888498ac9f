// ============================
// smartfarm-backend/src/sweep.rs
// ============================
//! Daily expiry reminders.
//!
//! A sweep asks an [`ExpiryFeed`] for every item that expires `lead_days` from
//! today, mails each owner and records the per-item outcome back to the feed.
//! One bad item never stops the rest of the batch.
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics::counter;
use thiserror::Error;

use crate::clock::Clock;
use crate::metrics::SWEEP_FAILED_ITEMS;
use crate::notify::{templates, Mailer};

/// Days ahead of expiry at which reminders go out
pub const DEFAULT_LEAD_DAYS: i64 = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("expiry feed unavailable: {0}")]
    Feed(String),
}

/// An item due for a reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryNotice {
    pub item_id: i64,
    pub item_name: String,
    pub expires_on: NaiveDate,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed(String),
}

/// Source of due items and sink for delivery outcomes
#[async_trait]
pub trait ExpiryFeed: Send + Sync {
    async fn due_on(&self, date: NaiveDate) -> Result<Vec<ExpiryNotice>, SweepError>;

    async fn record(
        &self,
        item_id: i64,
        status: &DeliveryStatus,
        at: DateTime<Utc>,
    ) -> Result<(), SweepError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Outcomes the feed refused to store
    pub unrecorded: usize,
}

/// Run one sweep for items expiring `lead_days` after the clock's current date
pub async fn run_expiry_sweep(
    feed: &dyn ExpiryFeed,
    mailer: &dyn Mailer,
    clock: &dyn Clock,
    lead_days: i64,
) -> Result<SweepReport, SweepError> {
    let now = clock.now();
    let due_date = now.date_naive() + Duration::days(lead_days);
    let notices = feed.due_on(due_date).await.inspect_err(|e| {
        tracing::error!(error = %e, %due_date, "expiry sweep aborted, feed unavailable");
    })?;

    let mut report = SweepReport {
        due: notices.len(),
        ..SweepReport::default()
    };

    for notice in notices {
        let mail = templates::expiry_reminder(&notice.item_name, notice.expires_on, lead_days);
        let status = match mailer.send(&notice.recipient, &mail.subject, &mail.body).await {
            Ok(()) => {
                report.sent += 1;
                DeliveryStatus::Sent
            }
            Err(e) => {
                report.failed += 1;
                counter!(SWEEP_FAILED_ITEMS).increment(1);
                tracing::warn!(item_id = notice.item_id, error = %e, "expiry reminder failed");
                DeliveryStatus::Failed(e.to_string())
            }
        };

        if let Err(e) = feed.record(notice.item_id, &status, clock.now()).await {
            report.unrecorded += 1;
            tracing::error!(item_id = notice.item_id, error = %e, "could not record reminder outcome");
        }
    }

    tracing::info!(
        %due_date,
        due = report.due,
        sent = report.sent,
        failed = report.failed,
        "expiry sweep finished"
    );
    Ok(report)
}

/// One stored delivery outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub item_id: i64,
    pub status: DeliveryStatus,
    pub at: DateTime<Utc>,
}

/// In-process feed, for local runs and tests
#[derive(Debug, Default)]
pub struct MemoryExpiryFeed {
    items: Mutex<Vec<ExpiryNotice>>,
    log: Mutex<Vec<DeliveryRecord>>,
}

impl MemoryExpiryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, notice: ExpiryNotice) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }

    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ExpiryFeed for MemoryExpiryFeed {
    async fn due_on(&self, date: NaiveDate) -> Result<Vec<ExpiryNotice>, SweepError> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.expires_on == date)
            .cloned()
            .collect())
    }

    async fn record(
        &self,
        item_id: i64,
        status: &DeliveryStatus,
        at: DateTime<Utc>,
    ) -> Result<(), SweepError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DeliveryRecord {
                item_id,
                status: status.clone(),
                at,
            });
        Ok(())
    }
}
