//! End-to-end tests for the checkout HTTP surface.
//!
//! The router runs against the mock provider, the in-memory store and a
//! notifier that remembers what it was asked to send.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use checkout_payments::webhook::sign_payload;
use checkout_payments::{
    CheckoutConfig, MemoryPaymentStore, MockProvider, Notifier, REDACTED_EMAIL, RecordingMode,
    Result,
};
use checkout_server::{AppState, ServerConfig, router};

const SECRET: &str = "whsec_e2e";

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<bool> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(true)
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    provider: Arc<MockProvider>,
    store: Arc<MemoryPaymentStore>,
    notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    fn new(mode: RecordingMode) -> Self {
        let provider = Arc::new(
            MockProvider::new()
                .with_product("p1", "Rank VIP", "30 days of VIP", Some("price_1"))
                .with_product("p2", "Coming soon", "", None)
                .with_archived_product("p3", "Retired rank", "price_1")
                .with_price("price_1", 1999, "PLN"),
        );
        let store = Arc::new(MemoryPaymentStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let config = ServerConfig {
            stripe_key: "sk_test_unused".into(),
            webhook_secret: SECRET.into(),
            mongodb_uri: "mongodb://unused".into(),
            mongodb_database: "unused".into(),
            checkout: CheckoutConfig {
                success_url: "https://shop.example/success".into(),
                cancel_url: "https://shop.example/cancel".into(),
            },
            port: 0,
            notification_webhook: String::new(),
            recording_mode: mode,
            webhook_tolerance: Some(Duration::from_secs(300)),
        };

        let state = AppState::new(&config, provider.clone(), store.clone(), notifier.clone());
        Self {
            app: router(state.clone()),
            state,
            provider,
            store,
            notifier,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_webhook(&self, payload: &str, signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri("/webhook");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        self.send(builder.body(Body::from(payload.to_string())).unwrap())
            .await
    }

    /// Wait for background fulfillment to drain
    async fn settle(&self) {
        self.state.fulfillment.flush().await;
    }

    fn notifications(&self) -> Vec<String> {
        self.notifier.messages.lock().unwrap().clone()
    }
}

fn completed_event(event_id: &str, metadata: &Value, email: &str) -> String {
    json!({
        "id": event_id,
        "object": "event",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_0001",
                "object": "checkout.session",
                "metadata": metadata,
                "customer_details": { "email": email }
            }
        }
    })
    .to_string()
}

fn sign(payload: &str) -> String {
    sign_payload(payload, SECRET, chrono::Utc::now().timestamp()).unwrap()
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn products_lists_only_priced_active_products() {
    let app = TestApp::new(RecordingMode::Loose);

    let (status, body) = app.get("/products").await;
    assert_eq!(status, StatusCode::OK);

    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], "p1");
    assert_eq!(products[0]["price_id"], "price_1");
    assert_eq!(products[0]["price"], json!(19.99));
    assert_eq!(products[0]["currency"], "pln");
}

#[tokio::test]
async fn products_by_id() {
    let app = TestApp::new(RecordingMode::Loose);

    let (status, body) = app.get("/products?product_id=p1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["name"], "Rank VIP");

    let (status, body) = app.get("/products?product_id=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn products_upstream_failure_is_bad_gateway() {
    let app = TestApp::new(RecordingMode::Loose);
    app.provider.set_offline(true);

    let (status, body) = app.get("/products").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn create_checkout_session_returns_id_and_url() {
    let app = TestApp::new(RecordingMode::Loose);

    let (status, body) = app
        .post_json(
            "/create-checkout-session",
            &json!({ "product_id": "p1", "nickname": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert!(body["url"].as_str().unwrap().contains("nickname=alice"));

    let requests = app.provider.session_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].price_id, "price_1");
    assert_eq!(requests[0].quantity, 1);
    assert_eq!(requests[0].metadata["nickname"], "alice");
    assert_eq!(requests[0].metadata["product_id"], "p1");
    assert_eq!(requests[0].success_url, "https://shop.example/success?nickname=alice");
}

#[tokio::test]
async fn create_checkout_session_rejects_bad_input() {
    let app = TestApp::new(RecordingMode::Loose);

    let (status, body) = app
        .post_json(
            "/create-checkout-session",
            &json!({ "product_id": "nope", "nickname": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product not found");

    let (status, _) = app
        .post_json(
            "/create-checkout-session",
            &json!({ "product_id": "p1", "nickname": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_json("/create-checkout-session", &json!({ "nickname": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    assert!(app.provider.session_requests().is_empty());
}

// =============================================================================
// Webhook
// =============================================================================

#[tokio::test]
async fn completed_checkout_is_recorded_and_redacted() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = completed_event(
        "evt_1",
        &json!({ "nickname": "alice", "product_id": "p1" }),
        "a@x.com",
    );

    let (status, body) = app.post_webhook(&payload, Some(&sign(&payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    app.settle().await;

    let records = app.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].nickname, "alice");
    assert_eq!(records[0].product_name, "Rank VIP");
    assert_eq!(records[0].email, "a@x.com");
    assert_eq!(app.notifications(), ["alice bought Rank VIP"]);

    let (status, body) = app.get("/last").await;
    assert_eq!(status, StatusCode::OK);
    let last = body["last_payments"].as_array().unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0]["email"], REDACTED_EMAIL);
    assert_eq!(last[0]["nickname"], "alice");
    assert_eq!(last[0]["product_name"], "Rank VIP");
    assert!(last[0]["date"].is_string());
    assert!(last[0].get("event_id").is_none());
    assert!(!body.to_string().contains("a@x.com"));
}

#[tokio::test]
async fn redelivered_event_is_recorded_twice_in_loose_mode() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = completed_event(
        "evt_1",
        &json!({ "nickname": "alice", "product_id": "p1" }),
        "a@x.com",
    );
    let signature = sign(&payload);

    for _ in 0..2 {
        let (status, _) = app.post_webhook(&payload, Some(&signature)).await;
        assert_eq!(status, StatusCode::OK);
    }
    app.settle().await;

    assert_eq!(app.store.records().len(), 2);
    assert_eq!(app.notifications().len(), 2);
}

#[tokio::test]
async fn redelivered_event_is_recorded_once_in_strict_mode() {
    let app = TestApp::new(RecordingMode::Strict);
    let payload = completed_event(
        "evt_1",
        &json!({ "nickname": "alice", "product_id": "p1" }),
        "a@x.com",
    );
    let signature = sign(&payload);

    for _ in 0..2 {
        let (status, _) = app.post_webhook(&payload, Some(&signature)).await;
        assert_eq!(status, StatusCode::OK);
    }
    app.settle().await;

    assert_eq!(app.store.records().len(), 1);
}

#[tokio::test]
async fn unhandled_event_type_is_acknowledged_without_side_effects() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = json!({
        "id": "evt_2",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string();

    let (status, body) = app.post_webhook(&payload, Some(&sign(&payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    app.settle().await;
    assert!(app.store.records().is_empty());
    assert!(app.notifications().is_empty());
}

#[tokio::test]
async fn empty_nickname_is_rejected_before_persistence() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = completed_event(
        "evt_3",
        &json!({ "nickname": "", "product_id": "p1" }),
        "a@x.com",
    );

    let (status, body) = app.post_webhook(&payload, Some(&sign(&payload))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_METADATA");

    app.settle().await;
    assert!(app.store.records().is_empty());
    assert!(app.notifications().is_empty());
}

#[tokio::test]
async fn legacy_nick_metadata_is_accepted() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = completed_event(
        "evt_4",
        &json!({ "nick": "bob", "product_id": "p1" }),
        "b@x.com",
    );

    let (status, _) = app.post_webhook(&payload, Some(&sign(&payload))).await;
    assert_eq!(status, StatusCode::OK);

    app.settle().await;
    assert_eq!(app.store.records()[0].nickname, "bob");
}

#[tokio::test]
async fn unknown_product_is_rejected() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = completed_event(
        "evt_5",
        &json!({ "nickname": "alice", "product_id": "p404" }),
        "a@x.com",
    );

    let (status, body) = app.post_webhook(&payload, Some(&sign(&payload))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Incorrect product_id");

    app.settle().await;
    assert!(app.store.records().is_empty());
}

#[tokio::test]
async fn signature_failures_are_bad_requests() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = completed_event(
        "evt_6",
        &json!({ "nickname": "alice", "product_id": "p1" }),
        "a@x.com",
    );
    let signature = sign(&payload);

    // Missing header
    let (status, body) = app.post_webhook(&payload, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");

    // One byte changed
    let tampered = payload.replacen("alice", "alicf", 1);
    let (status, _) = app.post_webhook(&tampered, Some(&signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Malformed header
    let (status, _) = app.post_webhook(&payload, Some("v1=nothex")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.settle().await;
    assert!(app.store.records().is_empty());
}

#[tokio::test]
async fn malformed_json_with_valid_signature_is_decode_error() {
    let app = TestApp::new(RecordingMode::Loose);
    let payload = "{\"id\": \"evt_7\", \"type\": ";

    let (status, body) = app.post_webhook(payload, Some(&sign(payload))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DECODE_ERROR");
}

#[tokio::test]
async fn storage_outage_still_acknowledges() {
    let app = TestApp::new(RecordingMode::Loose);
    app.store.set_failing(true);
    let mut failures = app.state.fulfillment.subscribe_failures();

    let payload = completed_event(
        "evt_8",
        &json!({ "nickname": "alice", "product_id": "p1" }),
        "a@x.com",
    );
    let (status, body) = app.post_webhook(&payload, Some(&sign(&payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    app.settle().await;
    assert_eq!(failures.try_recv().unwrap().event_id, "evt_8");

    let (status, body) = app.get("/last").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to get last payments");
}
