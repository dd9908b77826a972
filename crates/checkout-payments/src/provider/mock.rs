//! Mock Payment Provider
//!
//! For testing and local development. Serves a seeded in-memory catalog
//! and records every checkout session request it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{PaymentProvider, ProviderPrice, ProviderProduct};
use crate::checkout::{CheckoutSession, SessionRequest};
use crate::error::{PaymentError, Result};

/// In-memory provider with a static catalog
#[derive(Default)]
pub struct MockProvider {
    products: Vec<(ProviderProduct, bool)>,
    prices: HashMap<String, ProviderPrice>,
    sessions: RwLock<Vec<SessionRequest>>,
    next_session: AtomicU64,
    offline: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active product, optionally pointing at a default price
    #[must_use]
    pub fn with_product(
        mut self,
        id: &str,
        name: &str,
        description: &str,
        default_price_id: Option<&str>,
    ) -> Self {
        self.products.push((
            ProviderProduct {
                id: id.into(),
                name: name.into(),
                description: description.into(),
                default_price_id: default_price_id.map(Into::into),
            },
            true,
        ));
        self
    }

    /// Add an archived product (retrievable, never listed)
    #[must_use]
    pub fn with_archived_product(mut self, id: &str, name: &str, default_price_id: &str) -> Self {
        self.products.push((
            ProviderProduct {
                id: id.into(),
                name: name.into(),
                description: String::new(),
                default_price_id: Some(default_price_id.into()),
            },
            false,
        ));
        self
    }

    /// Add a price in minor units
    #[must_use]
    pub fn with_price(mut self, id: &str, unit_amount: i64, currency: &str) -> Self {
        self.prices.insert(
            id.into(),
            ProviderPrice {
                id: id.into(),
                unit_amount: Some(unit_amount),
                currency: currency.to_lowercase(),
            },
        );
        self
    }

    /// Simulate a transport failure on every subsequent call
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Session requests received so far, oldest first
    pub fn session_requests(&self) -> Vec<SessionRequest> {
        self.sessions
            .read()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PaymentError::Upstream("mock provider offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn list_active_products(&self) -> Result<Vec<ProviderProduct>> {
        self.ensure_online()?;
        Ok(self
            .products
            .iter()
            .filter(|(_, active)| *active)
            .map(|(product, _)| product.clone())
            .collect())
    }

    async fn retrieve_product(&self, product_id: &str) -> Result<ProviderProduct> {
        self.ensure_online()?;
        self.products
            .iter()
            .find(|(product, _)| product.id == product_id)
            .map(|(product, _)| product.clone())
            .ok_or_else(|| PaymentError::NotFound(format!("product {product_id}")))
    }

    async fn retrieve_price(&self, price_id: &str) -> Result<ProviderPrice> {
        self.ensure_online()?;
        self.prices
            .get(price_id)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(format!("price {price_id}")))
    }

    async fn create_checkout_session(&self, request: &SessionRequest) -> Result<CheckoutSession> {
        self.ensure_online()?;

        let n = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n:04}");
        let url = format!(
            "https://checkout.stripe.test/pay/{id}?return_to={}",
            request.success_url
        );

        self.sessions
            .write()
            .map_err(|_| PaymentError::Upstream("mock session log poisoned".into()))?
            .push(request.clone());

        Ok(CheckoutSession { id, url })
    }

    fn name(&self) -> &str {
        "MockProvider"
    }
}
