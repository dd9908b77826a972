//! HTTP surface of the checkout backend
//!
//! | Route                      | Method | Purpose                          |
//! |----------------------------|--------|----------------------------------|
//! | `/products`                | GET    | Whole catalog or one product     |
//! | `/create-checkout-session` | POST   | Open a hosted checkout           |
//! | `/webhook`                 | POST   | Signed Stripe events             |
//! | `/last`                    | GET    | Five most recent sales, redacted |

pub mod config;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    create_checkout_session, health_check, last_payments, list_products, stripe_webhook,
};
pub use crate::config::ServerConfig;
pub use crate::state::AppState;

/// Build the router with CORS and request tracing
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/products", get(list_products))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/webhook", post(stripe_webhook))
        .route("/last", get(last_payments))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
