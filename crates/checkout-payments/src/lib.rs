//! # checkout-payments
//!
//! Stripe-backed checkout for a small shop: list products, open hosted
//! checkout sessions, verify webhooks and record completed payments.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐  browse   ┌─────────┐  buy   ┌─────────────────┐  redirect  ┌─────────────┐
//! │  Client  │─────────▶│ Catalog │──────▶│ CheckoutBuilder │──────────▶│ Stripe page │
//! └──────────┘           └─────────┘        └─────────────────┘            └──────┬──────┘
//!                                                                                 │ signed event
//!        ┌──────────────┐   enqueue   ┌──────────────────┐   verify/decode  ┌────▼───────────┐
//!        │ Notifier     │◀───────────│ FulfillmentQueue │◀────────────────│ WebhookHandler │
//!        └──────────────┘  (record)   └──────────────────┘                  └────────────────┘
//! ```
//!
//! The session's metadata (`nickname`, `product_id`) is the only link
//! between a checkout and its later webhook; there is no local order table.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use checkout_payments::{Catalog, CheckoutBuilder, CheckoutConfig, StripeClient};
//!
//! let provider = Arc::new(StripeClient::new("sk_test_xxx"));
//! let catalog = Catalog::new(provider.clone());
//! let checkout = CheckoutBuilder::new(provider, CheckoutConfig {
//!     success_url: "https://shop.example/success".into(),
//!     cancel_url: "https://shop.example/cancel".into(),
//! });
//!
//! let product = catalog.get_product("prod_123").await?;
//! let session = checkout
//!     .create_checkout_session(&product.id, &product.price_id, "alice")
//!     .await?;
//!
//! // Redirect user to: session.url
//! ```

mod catalog;
mod checkout;
mod error;
mod fulfillment;
mod notify;
mod provider;
mod recorder;
mod store;
pub mod webhook;

pub use catalog::{Catalog, Price, Product, minor_to_major};
pub use checkout::{
    CheckoutBuilder, CheckoutConfig, CheckoutSession, METADATA_NICKNAME, METADATA_PRODUCT_ID,
    PaymentMethod, SessionMode, SessionRequest,
};
pub use error::{PaymentError, Result};
pub use fulfillment::{Fulfillment, FulfillmentFailure, FulfillmentQueue, FulfillmentStage};
pub use notify::{DiscordNotifier, Notifier, parse_toggle};
pub use provider::{MockProvider, PaymentProvider, ProviderPrice, ProviderProduct, StripeClient};
pub use recorder::{PaymentRecorder, REDACTED_EMAIL, RecordOutcome, RecordingMode};
#[cfg(feature = "mongodb")]
pub use store::MongoPaymentStore;
pub use store::{MemoryPaymentStore, PaymentRecord, PaymentStore};
pub use webhook::{WebhookHandler, WebhookOutcome};
