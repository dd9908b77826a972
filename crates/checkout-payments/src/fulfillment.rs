//! Background fulfillment
//!
//! Webhook requests are acknowledged as soon as the event is verified and
//! decoded. Recording the payment and announcing the sale happen afterwards
//! on a detached worker; failures there are logged and published on a
//! broadcast channel, never returned to the provider.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::notify::Notifier;
use crate::recorder::{PaymentRecorder, RecordOutcome};
use crate::store::PaymentRecord;

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Work for one completed checkout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fulfillment {
    pub event_id: String,
    pub email: String,
    pub nickname: String,
    pub product_name: String,
    pub date: DateTime<Utc>,
}

impl Fulfillment {
    /// Sale announcement text
    pub fn message(&self) -> String {
        format!("{} bought {}", self.nickname, self.product_name)
    }

    fn to_record(&self) -> PaymentRecord {
        PaymentRecord {
            event_id: self.event_id.clone(),
            email: self.email.clone(),
            nickname: self.nickname.clone(),
            product_name: self.product_name.clone(),
            date: self.date,
        }
    }
}

/// Which step of fulfillment failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FulfillmentStage {
    Persistence,
    Notification,
}

/// A post-acknowledgement failure
#[derive(Clone, Debug)]
pub struct FulfillmentFailure {
    pub event_id: String,
    pub stage: FulfillmentStage,
    pub error: String,
}

enum Job {
    Fulfill(Fulfillment),
    Flush(oneshot::Sender<()>),
}

/// Handle to the fulfillment worker
#[derive(Clone)]
pub struct FulfillmentQueue {
    jobs: mpsc::UnboundedSender<Job>,
    failures: broadcast::Sender<FulfillmentFailure>,
}

impl FulfillmentQueue {
    /// Start the worker on the current tokio runtime
    pub fn spawn(recorder: PaymentRecorder, notifier: Arc<dyn Notifier>) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        tokio::spawn(run_worker(rx, recorder, notifier, failures.clone()));

        Self { jobs, failures }
    }

    /// Queue a fulfillment; never blocks
    pub fn enqueue(&self, job: Fulfillment) {
        let event_id = job.event_id.clone();
        if self.jobs.send(Job::Fulfill(job)).is_err() {
            tracing::error!(event_id = %event_id, "Fulfillment worker stopped, payment not recorded");
        }
    }

    /// Wait until every job queued before this call has been processed
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Receive failures that happen after this call
    pub fn subscribe_failures(&self) -> broadcast::Receiver<FulfillmentFailure> {
        self.failures.subscribe()
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    recorder: PaymentRecorder,
    notifier: Arc<dyn Notifier>,
    failures: broadcast::Sender<FulfillmentFailure>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Fulfill(job) => fulfill(&recorder, notifier.as_ref(), &failures, job).await,
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Fulfillment worker shutting down");
}

async fn fulfill(
    recorder: &PaymentRecorder,
    notifier: &dyn Notifier,
    failures: &broadcast::Sender<FulfillmentFailure>,
    job: Fulfillment,
) {
    let report = |stage, error: String| {
        // No subscribers is fine, the log line is the record
        let _ = failures.send(FulfillmentFailure {
            event_id: job.event_id.clone(),
            stage,
            error,
        });
    };

    match recorder.record_payment(job.to_record()).await {
        Ok(RecordOutcome::Recorded) => {}
        Ok(RecordOutcome::Duplicate) => return,
        Err(e) => {
            tracing::error!(event_id = %job.event_id, error = %e, "Cannot insert payment");
            report(FulfillmentStage::Persistence, e.to_string());
        }
    }

    match notifier.notify(&job.message()).await {
        Ok(true) => tracing::debug!(event_id = %job.event_id, "Sent sale notification"),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(event_id = %job.event_id, error = %e, "Cannot send sale notification");
            report(FulfillmentStage::Notification, e.to_string());
        }
    }
}
