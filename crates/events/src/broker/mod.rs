//! Broker client contract.
//!
//! The broker is an external, durable, at-least-once pub/sub service. The
//! core only depends on [`EventBroker`]; two implementations ship with the
//! crate:
//!
//! - [`InProcessBroker`]: bounded `tokio::sync::mpsc` queues for local
//!   development and tests.
//! - [`HttpBroker`]: a client for a PutEvents-style HTTP endpoint.
//!
//! A broker client is created once at process start and shared as
//! `Arc<dyn EventBroker>`.

pub mod http;
pub mod in_process;

use async_trait::async_trait;
use courier_core::types::Timestamp;
use serde::{Deserialize, Serialize};

pub use http::HttpBroker;
pub use in_process::InProcessBroker;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure to hand an event to the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The bus does not exist or cannot accept events right now.
    #[error("Event bus unavailable: {0}")]
    Unavailable(String),

    /// The broker refused the call because of rate limiting.
    #[error("Event bus throttled the request: {0}")]
    Throttled(String),

    /// The `detail` string is not a JSON object.
    #[error("Event detail is not valid JSON: {0}")]
    InvalidDetail(#[from] serde_json::Error),

    /// Network-level failure talking to a remote broker.
    #[error("Broker request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Entry / receipt
// ---------------------------------------------------------------------------

/// One event submitted to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerEntry {
    /// Logical producer name, e.g. `"communications.service"`.
    pub source: String,
    /// Routing tag, e.g. `"EmailNotification"`.
    pub detail_type: String,
    /// JSON-encoded event detail.
    pub detail: String,
    /// Name of the bus the event is submitted to.
    pub event_bus_name: String,
}

/// Per-entry rejection reported by a broker that accepted the call itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRejection {
    pub code: String,
    pub message: String,
}

/// What the broker reported back for a single submitted entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrokerReceipt {
    /// Broker-assigned event id, if the broker returns one.
    pub event_id: Option<String>,
    /// Set when the entry itself was rejected.
    pub rejection: Option<EntryRejection>,
}

// ---------------------------------------------------------------------------
// Delivered event
// ---------------------------------------------------------------------------

/// An event as the broker presents it to consumers.
///
/// This is the wrapped delivery form: the published envelope sits under
/// `detail`, next to broker metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEvent {
    pub id: String,
    pub source: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    #[serde(rename = "event-bus-name")]
    pub event_bus_name: String,
    pub time: Timestamp,
    pub detail: serde_json::Value,
}

// ---------------------------------------------------------------------------
// EventBroker
// ---------------------------------------------------------------------------

/// Client side of the broker contract.
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Submit exactly one entry. Implementations must not retry or batch.
    async fn put_event(&self, entry: BrokerEntry) -> Result<BrokerReceipt, BrokerError>;
}
