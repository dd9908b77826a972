//! Stripe Webhook Handling
//!
//! Verifies, decodes and dispatches webhook events. Signature
//! verification is the only trust boundary; nothing downstream re-checks
//! authenticity.

mod event;
mod signature;

pub use event::{CHECKOUT_SESSION_COMPLETED, CompletedCheckout, EventKind, WebhookEvent};
pub use signature::{VerifiedPayload, sign_payload, verify_signature};

use std::time::Duration;

use chrono::Utc;

use crate::catalog::Catalog;
use crate::error::{PaymentError, Result};
use crate::fulfillment::{Fulfillment, FulfillmentQueue};

/// Stripe's default signature tolerance
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// What happened to an accepted event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Completed checkout, fulfillment queued
    Accepted {
        event_id: String,
        nickname: String,
        product_name: String,
    },

    /// Event type we do not act on
    Ignored { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler {
    catalog: Catalog,
    secret: String,
    tolerance: Option<Duration>,
    fulfillment: FulfillmentQueue,
}

impl WebhookHandler {
    pub fn new(catalog: Catalog, secret: impl Into<String>, fulfillment: FulfillmentQueue) -> Self {
        Self {
            catalog,
            secret: secret.into(),
            tolerance: Some(DEFAULT_TOLERANCE),
            fulfillment,
        }
    }

    /// Maximum signature age; `None` accepts any age
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Option<Duration>) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Check the signature and its age
    pub fn verify<'a>(&self, payload: &'a str, signature: &str) -> Result<VerifiedPayload<'a>> {
        let verified = verify_signature(payload, signature, &self.secret)?;

        if let Some(tolerance) = self.tolerance {
            let tolerance_secs = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
            if !verified.is_fresh(tolerance_secs, Utc::now().timestamp()) {
                return Err(PaymentError::InvalidSignature(format!(
                    "timestamp {} outside tolerance",
                    verified.timestamp()
                )));
            }
        }

        Ok(verified)
    }

    /// Verify, decode and dispatch one delivery
    pub async fn handle(&self, payload: &str, signature: &str) -> Result<WebhookOutcome> {
        let event = self.verify(payload, signature)?.decode()?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.kind.event_type(),
            "Processing Stripe webhook"
        );

        self.dispatch(event).await
    }

    async fn dispatch(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        match event.kind {
            EventKind::CheckoutSessionCompleted(session) => {
                let (nickname, product_id) = session.purchase_context()?;

                let product = self.catalog.get_product(product_id).await.map_err(|e| match e {
                    PaymentError::NotFound(detail) => PaymentError::InvalidProduct(detail),
                    other => other,
                })?;

                self.fulfillment.enqueue(Fulfillment {
                    event_id: event.id.clone(),
                    email: session.customer_email.clone(),
                    nickname: nickname.to_string(),
                    product_name: product.name.clone(),
                    date: Utc::now(),
                });

                Ok(WebhookOutcome::Accepted {
                    event_id: event.id,
                    nickname: nickname.to_string(),
                    product_name: product.name,
                })
            }

            EventKind::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }
}
