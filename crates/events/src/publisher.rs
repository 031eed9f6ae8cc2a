//! Publishing envelopes to the broker.
//!
//! [`Publisher`] makes exactly one broker call per [`Publisher::publish`]
//! invocation. It never retries, buffers or batches; whether to retry a
//! failed publish is the caller's decision.

use std::sync::Arc;

use courier_core::message_id::MessageId;

use crate::broker::{BrokerEntry, BrokerError, EventBroker};
use crate::config::BusConfig;
use crate::envelope::{ChannelPayload, Envelope};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// A publish attempt that did not reach the bus.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The envelope could not be encoded as the event detail.
    #[error("Failed to serialize event detail: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The broker call itself failed (network, throttling, bus unavailable).
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The broker accepted the call but rejected the entry.
    #[error("Event bus rejected the event ({code}): {message}")]
    Rejected { code: String, message: String },
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Proof that an envelope was handed to the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Correlation handle for the asynchronous delivery.
    pub message_id: MessageId,
    /// Broker-assigned event id, when the broker returns one.
    pub event_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Submits envelopes to a single event bus.
pub struct Publisher {
    broker: Arc<dyn EventBroker>,
    event_bus_name: String,
    source: String,
}

impl Publisher {
    /// Create a publisher around a long-lived broker client.
    pub fn new(broker: Arc<dyn EventBroker>, config: &BusConfig) -> Self {
        Self {
            broker,
            event_bus_name: config.event_bus_name.clone(),
            source: config.source.clone(),
        }
    }

    pub fn event_bus_name(&self) -> &str {
        &self.event_bus_name
    }

    /// Publish `envelope` under its channel's detail type.
    pub async fn publish<P: ChannelPayload>(
        &self,
        envelope: &Envelope<P>,
    ) -> Result<PublishReceipt, PublishError> {
        let detail_type = envelope.channel().detail_type();
        let entry = BrokerEntry {
            source: self.source.clone(),
            detail_type: detail_type.to_string(),
            detail: envelope.to_detail().map_err(PublishError::Serialization)?,
            event_bus_name: self.event_bus_name.clone(),
        };

        let receipt = self.broker.put_event(entry).await.inspect_err(|e| {
            tracing::error!(
                error = %e,
                message_id = %envelope.message_id(),
                detail_type,
                "Failed to publish event"
            );
        })?;

        if let Some(rejection) = receipt.rejection {
            tracing::error!(
                code = %rejection.code,
                message_id = %envelope.message_id(),
                detail_type,
                "Event bus rejected event"
            );
            return Err(PublishError::Rejected {
                code: rejection.code,
                message: rejection.message,
            });
        }

        tracing::info!(
            message_id = %envelope.message_id(),
            event_id = ?receipt.event_id,
            detail_type,
            event_bus = %self.event_bus_name,
            "Event published"
        );

        Ok(PublishReceipt {
            message_id: envelope.message_id().clone(),
            event_id: receipt.event_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
