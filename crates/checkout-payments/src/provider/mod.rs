//! Payment Provider Integration
//!
//! Abstraction over the remote payment provider. Everything here is a
//! live remote call; nothing is cached.

mod mock;
mod stripe_client;

pub use mock::MockProvider;
pub use stripe_client::StripeClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::checkout::{CheckoutSession, SessionRequest};
use crate::error::Result;

/// Product as the provider reports it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    /// `None` when the product has no default price configured
    pub default_price_id: Option<String>,
}

/// Price as the provider reports it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPrice {
    pub id: String,
    /// Amount in minor currency units; `None` for tiered/custom prices
    pub unit_amount: Option<i64>,
    /// Lower-case ISO currency code
    pub currency: String,
}

/// Payment provider trait (Strategy pattern)
///
/// `StripeClient` talks to the real API, `MockProvider` serves tests and
/// offline development.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// All active products, following pagination to the end
    async fn list_active_products(&self) -> Result<Vec<ProviderProduct>>;

    /// Fetch a single product
    async fn retrieve_product(&self, product_id: &str) -> Result<ProviderProduct>;

    /// Fetch a single price
    async fn retrieve_price(&self, price_id: &str) -> Result<ProviderPrice>;

    /// Create a hosted checkout session
    async fn create_checkout_session(&self, request: &SessionRequest) -> Result<CheckoutSession>;

    /// Provider name
    fn name(&self) -> &str;
}
