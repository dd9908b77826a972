//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach: build a one-time
//! payment session for a single product and redirect the buyer to it.
//!
//! There is no local order table. The nickname and product id travel as
//! session metadata and come back in the `checkout.session.completed`
//! webhook, so neither may ever be empty.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::provider::PaymentProvider;

/// Metadata key carrying the buyer's nickname
pub const METADATA_NICKNAME: &str = "nickname";

/// Metadata key carrying the purchased product id
pub const METADATA_PRODUCT_ID: &str = "product_id";

/// Redirect targets for hosted checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Base URL after successful payment; `nickname` is appended as a query parameter
    pub success_url: String,

    /// URL if checkout is cancelled
    pub cancel_url: String,
}

/// Payment methods offered on the hosted page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    /// Polish instant bank transfer
    Blik,
}

/// Session mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// One-time payment
    Payment,
}

/// Provider-neutral checkout session request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub price_id: String,
    pub quantity: u64,
    pub mode: SessionMode,
    pub payment_methods: Vec<PaymentMethod>,
    pub metadata: HashMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session ID
    pub id: String,

    /// URL to redirect user to
    pub url: String,
}

/// Builds and submits checkout sessions
#[derive(Clone)]
pub struct CheckoutBuilder {
    provider: Arc<dyn PaymentProvider>,
    config: CheckoutConfig,
}

impl CheckoutBuilder {
    pub fn new(provider: Arc<dyn PaymentProvider>, config: CheckoutConfig) -> Self {
        Self { provider, config }
    }

    /// Build the session request without contacting the provider
    pub fn build_request(&self, product_id: &str, price_id: &str, nickname: &str) -> Result<SessionRequest> {
        for (field, value) in [
            ("product_id", product_id),
            ("price_id", price_id),
            ("nickname", nickname),
        ] {
            if value.trim().is_empty() {
                return Err(PaymentError::InvalidRequest(format!("{field} must not be empty")));
            }
        }

        let success_url = Url::parse_with_params(&self.config.success_url, &[(METADATA_NICKNAME, nickname)])
            .map_err(|e| PaymentError::Config(format!("invalid success URL: {e}")))?;

        let mut metadata = HashMap::new();
        metadata.insert(METADATA_NICKNAME.to_string(), nickname.to_string());
        metadata.insert(METADATA_PRODUCT_ID.to_string(), product_id.to_string());

        Ok(SessionRequest {
            price_id: price_id.to_string(),
            quantity: 1,
            mode: SessionMode::Payment,
            payment_methods: vec![PaymentMethod::Card, PaymentMethod::Blik],
            metadata,
            success_url: success_url.into(),
            cancel_url: self.config.cancel_url.clone(),
        })
    }

    /// Create a hosted checkout session for one unit of `price_id`
    pub async fn create_checkout_session(
        &self,
        product_id: &str,
        price_id: &str,
        nickname: &str,
    ) -> Result<CheckoutSession> {
        let request = self.build_request(product_id, price_id, nickname)?;
        let session = self.provider.create_checkout_session(&request).await?;

        tracing::info!(
            session_id = %session.id,
            product_id = %product_id,
            nickname = %nickname,
            provider = self.provider.name(),
            "Created checkout session"
        );

        Ok(session)
    }
}
