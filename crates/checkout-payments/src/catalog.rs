//! Product Catalog
//!
//! Read-only view of the provider's products joined with their default
//! prices. Every call is a live lookup.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::provider::{PaymentProvider, ProviderProduct};

/// A purchasable product with its current price
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_id: String,
    /// Major currency units (minor / 100)
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
}

/// A resolved price
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
}

/// Catalog gateway over a payment provider
#[derive(Clone)]
pub struct Catalog {
    provider: Arc<dyn PaymentProvider>,
}

impl Catalog {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    /// All active products that have a resolvable default price.
    ///
    /// Products without a default price, or whose price lookup fails, are
    /// skipped rather than reported.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let listed = self.provider.list_active_products().await?;
        let mut products = Vec::with_capacity(listed.len());

        for product in listed {
            let Some(price_id) = product.default_price_id.as_deref() else {
                tracing::debug!(product_id = %product.id, "Skipping product without default price");
                continue;
            };

            match self.get_price(price_id).await {
                Ok(price) => products.push(join(product, price)),
                Err(e) => {
                    tracing::debug!(product_id = %product.id, error = %e, "Skipping product with unresolvable price");
                }
            }
        }

        Ok(products)
    }

    /// Single product with its default price
    pub async fn get_product(&self, product_id: &str) -> Result<Product> {
        let product = self.provider.retrieve_product(product_id).await?;

        let price_id = product
            .default_price_id
            .clone()
            .ok_or_else(|| PaymentError::NotFound(format!("default price of {product_id}")))?;

        let price = self.get_price(&price_id).await?;
        Ok(join(product, price))
    }

    /// Resolve a price, converting minor units to major units
    pub async fn get_price(&self, price_id: &str) -> Result<Price> {
        let price = self.provider.retrieve_price(price_id).await?;

        let minor = price
            .unit_amount
            .ok_or_else(|| PaymentError::NotFound(format!("unit amount of {price_id}")))?;

        Ok(Price {
            id: price.id,
            price: minor_to_major(minor),
            currency: price.currency,
        })
    }
}

/// 1999 -> 19.99
pub fn minor_to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

fn join(product: ProviderProduct, price: Price) -> Product {
    Product {
        id: product.id,
        name: product.name,
        description: product.description,
        price_id: price.id,
        price: price.price,
        currency: price.currency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use rust_decimal_macros::dec;

    fn catalog() -> Catalog {
        let provider = MockProvider::new()
            .with_product("p1", "Rank VIP", "30 days of VIP", Some("price_1"))
            .with_product("p2", "No price yet", "", None)
            .with_product("p3", "Broken price", "", Some("price_missing"))
            .with_price("price_1", 1999, "PLN");
        Catalog::new(Arc::new(provider))
    }

    #[test]
    fn test_minor_to_major() {
        assert_eq!(minor_to_major(1999), dec!(19.99));
        assert_eq!(minor_to_major(500), dec!(5.00));
        assert_eq!(minor_to_major(0), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_list_skips_products_without_price() {
        let products = catalog().list_products().await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "p1");
        assert!(products.iter().all(|p| !p.price_id.is_empty()));
    }

    #[tokio::test]
    async fn test_get_product_joins_price() {
        let product = catalog().get_product("p1").await.unwrap();

        assert_eq!(product.name, "Rank VIP");
        assert_eq!(product.price_id, "price_1");
        assert_eq!(product.price, dec!(19.99));
        assert_eq!(product.currency, "pln");
    }

    #[tokio::test]
    async fn test_get_product_not_found() {
        let err = catalog().get_product("nope").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound(_)));

        let err = catalog().get_product("p2").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_price_is_idempotent() {
        let catalog = catalog();
        let first = catalog.get_price("price_1").await.unwrap();
        let second = catalog.get_price("price_1").await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_price_serializes_as_number() {
        let price = Price {
            id: "price_1".into(),
            price: dec!(19.99),
            currency: "pln".into(),
        };
        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["price"], serde_json::json!(19.99));
    }
}
