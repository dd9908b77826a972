//! In-memory payment store (for development and tests)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{PaymentRecord, PaymentStore};
use crate::error::{PaymentError, Result};

#[derive(Default)]
pub struct MemoryPaymentStore {
    records: RwLock<Vec<PaymentRecord>>,
    failing: AtomicBool,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store being unreachable
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every stored record in insertion order, unredacted
    pub fn records(&self) -> Vec<PaymentRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentError::Persistence("memory store unavailable".into()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> PaymentError {
    PaymentError::Persistence("memory store lock poisoned".into())
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> Result<()> {
        self.ensure_available()?;
        self.records.write().map_err(poisoned)?.push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PaymentRecord>> {
        self.ensure_available()?;
        let records = self.records.read().map_err(poisoned)?;

        // Newest insert wins ties on equal dates
        let mut newest: Vec<PaymentRecord> = records.iter().rev().cloned().collect();
        newest.sort_by(|a, b| b.date.cmp(&a.date));
        newest.truncate(limit);
        Ok(newest)
    }

    async fn contains_event(&self, event_id: &str) -> Result<bool> {
        self.ensure_available()?;
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().any(|r| r.event_id == event_id))
    }
}
