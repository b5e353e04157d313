#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use voyage_core::templates::{RenderedEmail, TemplateCatalog};
use voyage_db::Stores;
use voyage_events::{EmailError, Mailer, PushError, PushMessage, PushTransport};

use voyage_api::auth::jwt::JwtConfig;
use voyage_api::config::{ServerConfig, StoreBackend};
use voyage_api::router::build_app_router;
use voyage_api::services::{build_state, Transports};
use voyage_api::state::AppState;

const TEST_JWT_SECRET: &str = "integration-test-secret-long-enough-for-hmac";

// ---------------------------------------------------------------------------
// Recording transports
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingPush {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, RenderedEmail)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, RenderedEmail)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), email.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults over in-memory stores.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        channel_timeout_secs: 2,
        retention_days: 90,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            token_ttl_mins: 15,
            issuer: None,
        },
    }
}

/// The full application plus handles on its transports and state.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub push: Arc<RecordingPush>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    /// A fresh clone of the router for one `oneshot` call.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers over
/// in-memory stores and recording transports.
pub fn build_test_app() -> TestApp {
    let push = Arc::new(RecordingPush::default());
    let mailer = Arc::new(RecordingMailer::default());

    let state = build_state(
        test_config(),
        None,
        Stores::in_memory(),
        Transports {
            push: push.clone(),
            mailer: Some(mailer.clone()),
        },
        TemplateCatalog::default(),
    );

    TestApp {
        router: build_app_router(state.clone()),
        state,
        push,
        mailer,
    }
}

pub fn token_for(user_id: &str, role: &str) -> String {
    test_config().jwt.issue(user_id, role).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn message_request(user_id: &str) -> Value {
    serde_json::json!({
        "user_id": user_id,
        "type": "message",
        "title": "New message from Ana",
        "message": "Is the loft free next weekend?",
        "data": {
            "kind": "message",
            "sender_id": "host-7",
            "sender_name": "Ana",
            "conversation_id": "conv-99"
        }
    })
}

pub fn payment_request(user_id: &str) -> Value {
    serde_json::json!({
        "user_id": user_id,
        "type": "payment",
        "title": "Payment received",
        "message": "Your payment went through.",
        "data": {
            "kind": "payment",
            "payment_id": "pay-1",
            "amount_cents": 12345,
            "currency": "EUR",
            "status": "completed"
        }
    })
}

/// Dispatch through the HTTP intake as a service caller, returning the record.
pub async fn dispatch(app: &TestApp, request: Value) -> Value {
    let response = post_json_auth(
        app.app(),
        "/api/v1/notifications/dispatch",
        request,
        &token_for("booking-service", "service"),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
