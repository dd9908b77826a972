//! Payment Recorder
//!
//! Appends one record per completed checkout and serves the recent-sales
//! feed. Customer emails never leave this module unredacted.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::store::{PaymentRecord, PaymentStore};

/// Placeholder that replaces customer emails in outgoing records
pub const REDACTED_EMAIL: &str = "[redacted]";

/// How redelivered events are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    /// Every delivery appends a record; provider redelivery duplicates it
    #[default]
    Loose,

    /// A record whose event id is already stored is skipped
    Strict,
}

impl FromStr for RecordingMode {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "loose" => Ok(Self::Loose),
            "strict" => Ok(Self::Strict),
            other => Err(PaymentError::Config(format!(
                "unknown recording mode {other:?} (expected loose or strict)"
            ))),
        }
    }
}

/// Outcome of [`PaymentRecorder::record_payment`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Strict mode only
    Duplicate,
}

impl PaymentRecord {
    /// Copy with the email replaced by [`REDACTED_EMAIL`]
    #[must_use]
    pub fn redacted(self) -> Self {
        Self {
            email: REDACTED_EMAIL.to_string(),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct PaymentRecorder {
    store: Arc<dyn PaymentStore>,
    mode: RecordingMode,
}

impl PaymentRecorder {
    pub fn new(store: Arc<dyn PaymentStore>, mode: RecordingMode) -> Self {
        Self { store, mode }
    }

    /// Append `record`, honoring the recording mode
    pub async fn record_payment(&self, record: PaymentRecord) -> Result<RecordOutcome> {
        // No lock spans the check and the insert; concurrent redeliveries
        // can still both land in strict mode.
        if self.mode == RecordingMode::Strict && self.store.contains_event(&record.event_id).await? {
            tracing::info!(event_id = %record.event_id, "Skipping already recorded event");
            return Ok(RecordOutcome::Duplicate);
        }

        self.store.insert(&record).await?;

        tracing::info!(
            event_id = %record.event_id,
            nickname = %record.nickname,
            product = %record.product_name,
            "Recorded payment"
        );

        Ok(RecordOutcome::Recorded)
    }

    /// The `limit` most recent records, emails redacted
    pub async fn recent(&self, limit: usize) -> Result<Vec<PaymentRecord>> {
        let records = self.store.recent(limit).await?;
        Ok(records.into_iter().map(PaymentRecord::redacted).collect())
    }
}
