//! HTTP Handlers

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use checkout_payments::{PaymentError, PaymentRecord, Product, WebhookOutcome};

use crate::state::AppState;

/// Number of payments shown by `GET /last`
pub const LAST_PAYMENTS_LIMIT: usize = 5;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProductsResponse {
    Single { product: Product },
    List { products: Vec<Product> },
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(alias = "productID")]
    pub product_id: String,
    pub nickname: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// One entry of the public payments feed; the email is already redacted
#[derive(Debug, Serialize)]
pub struct PaymentSummary {
    pub email: String,
    pub nickname: String,
    pub product_name: String,
    pub date: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentSummary {
    fn from(record: PaymentRecord) -> Self {
        Self {
            email: record.email,
            nickname: record.nickname,
            product_name: record.product_name,
            date: record.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LastPaymentsResponse {
    pub last_payments: Vec<PaymentSummary>,
}

fn api_error(err: &PaymentError) -> ApiError {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.user_message().into(),
            code: err.code().into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /products[?product_id=...]`
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    match query.product_id.filter(|id| !id.is_empty()) {
        Some(product_id) => {
            let product = state.catalog.get_product(&product_id).await.map_err(|e| {
                tracing::warn!(product_id = %product_id, error = %e, "Product lookup failed");
                api_error(&e)
            })?;
            Ok(Json(ProductsResponse::Single { product }))
        }
        None => {
            let products = state.catalog.list_products().await.map_err(|e| {
                tracing::error!(error = %e, "Product listing failed");
                api_error(&e)
            })?;
            Ok(Json(ProductsResponse::List { products }))
        }
    }
}

/// `POST /create-checkout-session`
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: rejection.body_text(),
                code: "INVALID_REQUEST".into(),
            }),
        )
    })?;

    if payload.nickname.trim().is_empty() {
        return Err(api_error(&PaymentError::InvalidRequest("nickname must not be empty".into())));
    }

    // Unknown products are the caller's fault here, not a missing route
    let product = state
        .catalog
        .get_product(&payload.product_id)
        .await
        .map_err(|e| match e {
            PaymentError::NotFound(detail) => {
                tracing::warn!(product_id = %payload.product_id, "Checkout for unknown product");
                let (_, body) = api_error(&PaymentError::NotFound(detail));
                (StatusCode::BAD_REQUEST, body)
            }
            other => {
                tracing::error!(error = %other, "Product lookup failed");
                api_error(&other)
            }
        })?;

    let session = state
        .checkout
        .create_checkout_session(&product.id, &product.price_id, &payload.nickname)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Checkout error");
            api_error(&e)
        })?;

    Ok(Json(CheckoutResponse {
        id: session.id,
        url: session.url,
    }))
}

/// `POST /webhook`
///
/// Answers `{"received": true}` once the event is verified and decoded;
/// recording and notification failures after that point only reach the logs.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| api_error(&PaymentError::InvalidSignature("missing Stripe-Signature header".into())))?;

    match state.webhooks.handle(&body, signature).await {
        Ok(WebhookOutcome::Accepted { event_id, nickname, product_name }) => {
            tracing::info!(event_id = %event_id, nickname = %nickname, product = %product_name, "Checkout completed");
        }
        Ok(WebhookOutcome::Ignored { .. }) => {}
        Err(e) => {
            match &e {
                PaymentError::InvalidSignature(_) => tracing::warn!(error = %e, "Webhook signature failed"),
                _ => tracing::error!(error = %e, "Webhook processing error"),
            }
            return Err(api_error(&e));
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// `GET /last`
pub async fn last_payments(State(state): State<AppState>) -> Result<Json<LastPaymentsResponse>, ApiError> {
    let records = state.recorder.recent(LAST_PAYMENTS_LIMIT).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to get last payments");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to get last payments".into(),
                code: e.code().into(),
            }),
        )
    })?;

    Ok(Json(LastPaymentsResponse {
        last_payments: records.into_iter().map(PaymentSummary::from).collect(),
    }))
}
