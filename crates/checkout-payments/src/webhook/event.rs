//! Webhook event envelope

use std::collections::HashMap;

use serde::Deserialize;

use crate::checkout::{METADATA_NICKNAME, METADATA_PRODUCT_ID};
use crate::error::{PaymentError, Result};

/// Event type tag for a completed hosted checkout
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Older sessions carried the nickname under this key
const LEGACY_NICKNAME_KEY: &str = "nick";

/// Camel-case spelling some clients used for the product id
const LEGACY_PRODUCT_ID_KEY: &str = "productID";

/// Decoded webhook event
#[derive(Clone, Debug)]
pub struct WebhookEvent {
    /// Provider event id (`evt_...`)
    pub id: String,
    pub kind: EventKind,
}

/// Known event types plus a catch-all
#[derive(Clone, Debug)]
pub enum EventKind {
    /// Checkout completed - record the payment
    CheckoutSessionCompleted(CompletedCheckout),

    /// Unhandled event type, acknowledged and ignored
    Other { event_type: String },
}

impl EventKind {
    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            Self::Other { event_type } => event_type,
        }
    }
}

/// The checkout session carried by a completed event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub customer_email: String,
    pub metadata: HashMap<String, String>,
}

impl CompletedCheckout {
    fn metadata_value(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.metadata.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    /// Buyer nickname, accepting the legacy `nick` key
    pub fn nickname(&self) -> Option<&str> {
        self.metadata_value(&[METADATA_NICKNAME, LEGACY_NICKNAME_KEY])
    }

    /// Purchased product id, accepting the legacy `productID` key
    pub fn product_id(&self) -> Option<&str> {
        self.metadata_value(&[METADATA_PRODUCT_ID, LEGACY_PRODUCT_ID_KEY])
    }

    /// `(nickname, product_id)`, both required
    pub fn purchase_context(&self) -> Result<(&str, &str)> {
        match (self.nickname(), self.product_id()) {
            (Some(nickname), Some(product_id)) => Ok((nickname, product_id)),
            _ => Err(PaymentError::MissingMetadata(format!(
                "session {} lacks nickname or product_id",
                self.session_id
            ))),
        }
    }
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct RawCheckoutSession {
    id: String,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    customer_details: Option<RawCustomerDetails>,
    #[serde(default)]
    customer_email: Option<String>,
}

#[derive(Deserialize)]
struct RawCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

pub(super) fn decode(payload: &str) -> Result<WebhookEvent> {
    let raw: RawEvent =
        serde_json::from_str(payload).map_err(|e| PaymentError::Decode(format!("event envelope: {e}")))?;

    let kind = match raw.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => {
            let session: RawCheckoutSession = serde_json::from_value(raw.data.object)
                .map_err(|e| PaymentError::Decode(format!("checkout session: {e}")))?;

            let customer_email = session
                .customer_details
                .and_then(|d| d.email)
                .or(session.customer_email)
                .unwrap_or_default();

            EventKind::CheckoutSessionCompleted(CompletedCheckout {
                session_id: session.id,
                customer_email,
                metadata: session.metadata.unwrap_or_default(),
            })
        }
        _ => EventKind::Other {
            event_type: raw.event_type,
        },
    };

    Ok(WebhookEvent { id: raw.id, kind })
}
