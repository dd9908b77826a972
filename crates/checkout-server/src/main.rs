//! Checkout backend HTTP server
//!
//! Stripe for products and payments, MongoDB for the sales log, Discord for
//! sale announcements.

use std::net::SocketAddr;
use std::sync::Arc;

use checkout_payments::{DiscordNotifier, MongoPaymentStore, StripeClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    let store = MongoPaymentStore::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    let provider = StripeClient::new(&config.stripe_key);

    let notifier = DiscordNotifier::new(&config.notification_webhook);
    if notifier.is_enabled() {
        tracing::info!("✓ Discord notifications enabled");
    } else {
        tracing::info!("Discord notifications disabled");
    }

    tracing::info!(mode = ?config.recording_mode, tolerance = ?config.webhook_tolerance, "Webhook settings");

    let state = AppState::new(&config, Arc::new(provider), Arc::new(store), Arc::new(notifier));
    let fulfillment = state.fulfillment.clone();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Checkout server running on http://{}", addr);
    tracing::info!("  GET  /products                 - List products");
    tracing::info!("  POST /create-checkout-session  - Create Stripe checkout");
    tracing::info!("  POST /webhook                  - Stripe webhook");
    tracing::info!("  GET  /last                     - Recent payments");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let queued payments land before exiting
    fulfillment.flush().await;
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
