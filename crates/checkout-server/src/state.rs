//! Application State

use std::sync::Arc;

use checkout_payments::{
    Catalog, CheckoutBuilder, FulfillmentQueue, Notifier, PaymentProvider, PaymentRecorder,
    PaymentStore, WebhookHandler,
};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product lookups
    pub catalog: Catalog,

    /// Hosted checkout sessions
    pub checkout: CheckoutBuilder,

    /// Signed webhook intake
    pub webhooks: Arc<WebhookHandler>,

    /// Recent payments feed
    pub recorder: PaymentRecorder,

    /// Background record + notify worker
    pub fulfillment: FulfillmentQueue,
}

impl AppState {
    /// Wire the components; spawns the fulfillment worker, so call inside a tokio runtime
    pub fn new(
        config: &ServerConfig,
        provider: Arc<dyn PaymentProvider>,
        store: Arc<dyn PaymentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Catalog::new(provider.clone());
        let checkout = CheckoutBuilder::new(provider, config.checkout.clone());
        let recorder = PaymentRecorder::new(store, config.recording_mode);
        let fulfillment = FulfillmentQueue::spawn(recorder.clone(), notifier);

        let webhooks = WebhookHandler::new(catalog.clone(), config.webhook_secret.clone(), fulfillment.clone())
            .with_tolerance(config.webhook_tolerance);

        Self {
            catalog,
            checkout,
            webhooks: Arc::new(webhooks),
            recorder,
            fulfillment,
        }
    }
}
