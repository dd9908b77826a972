//! Payment record storage
//!
//! Append-only: records are inserted and queried, never updated or deleted.

mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

pub use memory::MemoryPaymentStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoPaymentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One completed purchase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Provider event id the record was created from
    pub event_id: String,

    /// Customer email (redacted outside the recorder)
    pub email: String,

    pub nickname: String,

    pub product_name: String,

    /// When the payment was recorded
    pub date: DateTime<Utc>,
}

/// Payment storage trait
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Append a record
    async fn insert(&self, record: &PaymentRecord) -> Result<()>;

    /// Up to `limit` records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<PaymentRecord>>;

    /// Whether a record created from `event_id` exists
    async fn contains_event(&self, event_id: &str) -> Result<bool>;
}
