#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use courier_api::config::ServerConfig;
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_events::broker::{BrokerEntry, BrokerError, BrokerReceipt, EntryRejection};
use courier_events::{BusConfig, EventBroker, Publisher};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
    }
}

/// Build the full application router on top of the given broker.
///
/// Uses the same middleware stack as `main.rs` via `build_app_router`.
pub fn build_test_app(broker: Arc<dyn EventBroker>) -> Router {
    let config = test_config();
    let bus = BusConfig::default();

    let state = AppState {
        config: Arc::new(config.clone()),
        publisher: Arc::new(Publisher::new(broker, &bus)),
        bus: Arc::new(bus),
        started_at: Instant::now(),
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    post_raw(app, uri, &body.to_string()).await
}

/// POST a raw body with a JSON content type.
pub async fn post_raw(app: Router, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Test brokers
// ---------------------------------------------------------------------------

/// Accepts every entry and keeps a copy.
#[derive(Default)]
pub struct RecordingBroker {
    entries: Mutex<Vec<BrokerEntry>>,
}

impl RecordingBroker {
    pub fn entries(&self) -> Vec<BrokerEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventBroker for RecordingBroker {
    async fn put_event(&self, entry: BrokerEntry) -> Result<BrokerReceipt, BrokerError> {
        self.entries.lock().unwrap().push(entry);
        Ok(BrokerReceipt {
            event_id: Some("evt-test".into()),
            rejection: None,
        })
    }
}

/// Fails every call as an unreachable bus would.
pub struct UnavailableBroker;

#[async_trait]
impl EventBroker for UnavailableBroker {
    async fn put_event(&self, _entry: BrokerEntry) -> Result<BrokerReceipt, BrokerError> {
        Err(BrokerError::Unavailable("bus is down".into()))
    }
}

/// Accepts the call but rejects the entry.
pub struct RejectingBroker;

#[async_trait]
impl EventBroker for RejectingBroker {
    async fn put_event(&self, _entry: BrokerEntry) -> Result<BrokerReceipt, BrokerError> {
        Ok(BrokerReceipt {
            event_id: None,
            rejection: Some(EntryRejection {
                code: "InternalFailure".into(),
                message: "entry rejected".into(),
            }),
        })
    }
}
