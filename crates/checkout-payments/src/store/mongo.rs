//! MongoDB payment store
//!
//! Documents live in the `payment` collection:
//!
//! ```text
//! { email, nickname, productName, date: <BSON date>, eventId }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};

use super::{PaymentRecord, PaymentStore};
use crate::error::{PaymentError, Result};

/// Collection holding payment documents
pub const PAYMENT_COLLECTION: &str = "payment";

#[derive(Debug, Serialize, Deserialize)]
struct PaymentDocument {
    #[serde(rename = "eventId", default, skip_serializing_if = "String::is_empty")]
    event_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    nickname: String,
    #[serde(rename = "productName", default)]
    product_name: String,
    date: bson::DateTime,
}

impl From<&PaymentRecord> for PaymentDocument {
    fn from(record: &PaymentRecord) -> Self {
        Self {
            event_id: record.event_id.clone(),
            email: record.email.clone(),
            nickname: record.nickname.clone(),
            product_name: record.product_name.clone(),
            date: bson::DateTime::from_millis(record.date.timestamp_millis()),
        }
    }
}

impl From<PaymentDocument> for PaymentRecord {
    fn from(doc: PaymentDocument) -> Self {
        Self {
            event_id: doc.event_id,
            email: doc.email,
            nickname: doc.nickname,
            product_name: doc.product_name,
            date: DateTime::<Utc>::from_timestamp_millis(doc.date.timestamp_millis()).unwrap_or_default(),
        }
    }
}

/// Payment store backed by a MongoDB collection
#[derive(Clone)]
pub struct MongoPaymentStore {
    collection: Collection<PaymentDocument>,
}

impl MongoPaymentStore {
    /// Connect and ping the database
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| PaymentError::Upstream(format!("MongoDB connect failed: {e}")))?;

        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| PaymentError::Upstream(format!("MongoDB ping failed: {e}")))?;

        tracing::info!(database = %database, collection = PAYMENT_COLLECTION, "Connected to MongoDB");

        Ok(Self::from_database(&db))
    }

    /// Use the payment collection of an existing database handle
    pub fn from_database(db: &Database) -> Self {
        Self {
            collection: db.collection(PAYMENT_COLLECTION),
        }
    }
}

#[async_trait]
impl PaymentStore for MongoPaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> Result<()> {
        self.collection
            .insert_one(PaymentDocument::from(record))
            .await
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PaymentRecord>> {
        // MongoDB reads limit(0) as "no limit"
        if limit == 0 {
            return Ok(Vec::new());
        }

        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "date": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;

        let docs: Vec<PaymentDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;

        Ok(docs.into_iter().map(PaymentRecord::from).collect())
    }

    async fn contains_event(&self, event_id: &str) -> Result<bool> {
        let found = self
            .collection
            .find_one(doc! { "eventId": event_id })
            .await
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;
        Ok(found.is_some())
    }
}
