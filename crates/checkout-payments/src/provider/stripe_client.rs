//! Stripe API client
//!
//! Implements [`PaymentProvider`] on top of `async-stripe`. The API key is
//! held by the client instance, never in process-wide state.

use std::str::FromStr;

use async_trait::async_trait;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentMethodTypes, ListProducts, Price,
    PriceId, Product, ProductId, StripeError,
};

use super::{PaymentProvider, ProviderPrice, ProviderProduct};
use crate::checkout::{CheckoutSession, PaymentMethod, SessionRequest};
use crate::error::{PaymentError, Result};

/// Page size used when walking the product list
const PRODUCT_PAGE_SIZE: u64 = 100;

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn list_active_products(&self) -> Result<Vec<ProviderProduct>> {
        let mut products = Vec::new();
        let mut starting_after: Option<ProductId> = None;

        loop {
            let mut params = ListProducts::new();
            params.active = Some(true);
            params.limit = Some(PRODUCT_PAGE_SIZE);
            params.starting_after = starting_after.take();

            let page = Product::list(&self.client, &params)
                .await
                .map_err(|e| map_stripe_error("product list", e))?;

            starting_after = page.data.last().map(|p| p.id.clone());
            products.extend(page.data.into_iter().map(into_provider_product));

            if !page.has_more || starting_after.is_none() {
                break;
            }
        }

        tracing::debug!(count = products.len(), "Listed active Stripe products");
        Ok(products)
    }

    async fn retrieve_product(&self, product_id: &str) -> Result<ProviderProduct> {
        let id: ProductId = parse_id(product_id)?;

        let product = Product::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| map_stripe_error(&format!("product {product_id}"), e))?;

        Ok(into_provider_product(product))
    }

    async fn retrieve_price(&self, price_id: &str) -> Result<ProviderPrice> {
        let id: PriceId = parse_id(price_id)?;

        let price = Price::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| map_stripe_error(&format!("price {price_id}"), e))?;

        Ok(ProviderPrice {
            id: price.id.to_string(),
            unit_amount: price.unit_amount,
            currency: price.currency.map(|c| c.to_string()).unwrap_or_default(),
        })
    }

    async fn create_checkout_session(&self, request: &SessionRequest) -> Result<CheckoutSession> {
        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.payment_method_types = Some(
            request
                .payment_methods
                .iter()
                .map(|method| match method {
                    PaymentMethod::Card => CreateCheckoutSessionPaymentMethodTypes::Card,
                    PaymentMethod::Blik => CreateCheckoutSessionPaymentMethodTypes::Blik,
                })
                .collect(),
        );
        params.metadata = Some(request.metadata.clone());
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.clone()),
            quantity: Some(request.quantity),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| map_stripe_error("checkout session", e))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Upstream("No checkout URL returned".into()))?;

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url,
        })
    }

    fn name(&self) -> &str {
        "Stripe"
    }
}

fn into_provider_product(product: Product) -> ProviderProduct {
    ProviderProduct {
        id: product.id.to_string(),
        name: product.name.unwrap_or_default(),
        description: product.description.unwrap_or_default(),
        default_price_id: product.default_price.as_ref().map(|p| p.id().to_string()),
    }
}

/// Product and price ids may be user-provided, so any string is accepted
/// here and resolution is left to Stripe.
fn parse_id<T: FromStr>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| PaymentError::InvalidRequest(format!("unusable id {raw:?}")))
}

/// 404 from Stripe means the identifier does not resolve; everything else
/// is a transport/auth problem.
fn map_stripe_error(resource: &str, err: StripeError) -> PaymentError {
    match err {
        StripeError::Stripe(ref request) if request.http_status == 404 => {
            PaymentError::NotFound(resource.to_string())
        }
        other => PaymentError::Upstream(format!("{resource}: {other}")),
    }
}
