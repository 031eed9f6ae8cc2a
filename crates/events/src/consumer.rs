//! The per-channel consumer.
//!
//! [`Consumer`] runs every delivery attempt through the same sequence:
//!
//! ```text
//! Received -> Validating -> Delivering -> Succeeded
//!                  \             \
//!                   +-------------+-----> Failed
//! ```
//!
//! A failed attempt is returned as `Err(ConsumerError)` and never turned
//! into a success result. The consumer has no retry logic of its own;
//! redelivery belongs to the broker, which the invocation host signals by
//! failing the invocation.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::channels::ChannelType;
use courier_core::error::CoreError;
use courier_core::message_id::MessageId;
use courier_core::types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryBackend, DeliveryError, DeliveryResult};
use crate::envelope::{ChannelPayload, Envelope};
use crate::router::InboundDelivery;

/// `status` value of every successful invocation.
pub const STATUS_PROCESSED: &str = "processed";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Stage of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Received,
    Validating,
    Delivering,
    Succeeded,
    Failed,
}

impl ConsumerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsumerState::Received => "received",
            ConsumerState::Validating => "validating",
            ConsumerState::Delivering => "delivering",
            ConsumerState::Succeeded => "succeeded",
            ConsumerState::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Result / error
// ---------------------------------------------------------------------------

/// Invocation result of a successful delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMessage {
    pub success: bool,
    pub message_id: MessageId,
    pub status: String,
    pub result: DeliveryResult,
    pub timestamp: Timestamp,
}

/// A failed delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The invocation payload is not an envelope of this consumer's channel.
    #[error("Malformed delivery payload: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The envelope is missing required fields.
    #[error("Message {message_id} failed validation: {source}")]
    Validation {
        message_id: MessageId,
        #[source]
        source: CoreError,
    },

    /// The backend could not complete the send.
    #[error("Message {message_id} delivery failed: {source}")]
    Delivery {
        message_id: MessageId,
        #[source]
        source: DeliveryError,
    },
}

impl ConsumerError {
    /// Whether redelivering the same event can succeed.
    ///
    /// Malformed and invalid payloads fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsumerError::Delivery { .. })
    }

    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            ConsumerError::Malformed(_) => None,
            ConsumerError::Validation { message_id, .. }
            | ConsumerError::Delivery { message_id, .. } => Some(message_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Consumer bound to the channel of its backend's payload type.
///
/// Stateless between invocations; clones share the same backend.
pub struct Consumer<B> {
    backend: Arc<B>,
}

impl<B> Clone for Consumer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: DeliveryBackend> Consumer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn channel(&self) -> ChannelType {
        B::Payload::CHANNEL
    }

    pub fn provider(&self) -> &'static str {
        self.backend.provider()
    }

    /// Decode a raw invocation payload (bare or wrapped) and handle it.
    pub async fn handle_value(
        &self,
        raw: serde_json::Value,
    ) -> Result<ProcessedMessage, ConsumerError> {
        let delivery = InboundDelivery::from_value(raw).map_err(|e| {
            tracing::error!(error = %e, channel = %self.channel(), "Malformed delivery payload");
            ConsumerError::Malformed(e)
        })?;
        self.handle(delivery).await
    }

    /// Run one delivery attempt.
    pub async fn handle(
        &self,
        delivery: InboundDelivery<B::Payload>,
    ) -> Result<ProcessedMessage, ConsumerError> {
        let wrapped = delivery.is_wrapped();
        let envelope = delivery.into_envelope();
        let message_id = envelope.message_id().clone();
        let channel = self.channel();

        tracing::info!(
            %message_id,
            %channel,
            wrapped,
            recipient = %envelope.payload().log_recipient(),
            "Delivery received"
        );
        trace_state(&message_id, ConsumerState::Received);

        match self.attempt(&envelope).await {
            Ok(result) => {
                trace_state(&message_id, ConsumerState::Succeeded);
                Ok(ProcessedMessage {
                    success: true,
                    message_id,
                    status: STATUS_PROCESSED.to_string(),
                    result,
                    timestamp: chrono::Utc::now(),
                })
            }
            Err(e) => {
                trace_state(&message_id, ConsumerState::Failed);
                tracing::error!(
                    error = %e,
                    %message_id,
                    %channel,
                    retryable = e.is_retryable(),
                    "Delivery failed"
                );
                Err(e)
            }
        }
    }

    async fn attempt(
        &self,
        envelope: &Envelope<B::Payload>,
    ) -> Result<DeliveryResult, ConsumerError> {
        let message_id = envelope.message_id();

        trace_state(message_id, ConsumerState::Validating);
        self.backend
            .validate(envelope.payload())
            .map_err(|source| ConsumerError::Validation {
                message_id: message_id.clone(),
                source,
            })?;

        trace_state(message_id, ConsumerState::Delivering);
        self.backend
            .send(envelope)
            .await
            .map_err(|source| ConsumerError::Delivery {
                message_id: message_id.clone(),
                source,
            })
    }
}

fn trace_state(message_id: &MessageId, state: ConsumerState) {
    tracing::debug!(%message_id, state = state.as_str(), "Consumer state");
}

// ---------------------------------------------------------------------------
// InvocationTarget
// ---------------------------------------------------------------------------

/// Object-safe view of a consumer, used by invocation hosts that hold
/// consumers of different channels side by side.
#[async_trait]
pub trait InvocationTarget: Send + Sync {
    fn channel(&self) -> ChannelType;

    /// Provider of the backend behind this target.
    fn provider(&self) -> &'static str;

    /// Handle one raw invocation payload.
    async fn invoke(&self, payload: serde_json::Value) -> Result<ProcessedMessage, ConsumerError>;
}

#[async_trait]
impl<B: DeliveryBackend> InvocationTarget for Consumer<B> {
    fn channel(&self) -> ChannelType {
        B::Payload::CHANNEL
    }

    fn provider(&self) -> &'static str {
        self.backend.provider()
    }

    async fn invoke(&self, payload: serde_json::Value) -> Result<ProcessedMessage, ConsumerError> {
        self.handle_value(payload).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
