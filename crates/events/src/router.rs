//! Normalization of inbound broker deliveries.
//!
//! A consumer may be invoked with the bare published envelope (direct
//! invocation, tests) or with the broker's wrapper that carries the envelope
//! under `detail`. [`InboundDelivery`] accepts both and yields the canonical
//! [`Envelope`].

use serde::Deserialize;

use crate::envelope::{ChannelPayload, Envelope};

/// One delivery as handed to a consumer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundDelivery<P> {
    /// `{ "detail": <envelope>, ... }`. Other wrapper fields are ignored.
    Wrapped { detail: Envelope<P> },
    /// The envelope itself.
    Bare(Envelope<P>),
}

impl<P: ChannelPayload> InboundDelivery<P> {
    /// Decode a raw invocation payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Whether the envelope arrived inside the broker's wrapper.
    pub fn is_wrapped(&self) -> bool {
        matches!(self, InboundDelivery::Wrapped { .. })
    }

    pub fn into_envelope(self) -> Envelope<P> {
        match self {
            InboundDelivery::Wrapped { detail } => detail,
            InboundDelivery::Bare(envelope) => envelope,
        }
    }
}

impl<P: ChannelPayload> From<Envelope<P>> for InboundDelivery<P> {
    fn from(envelope: Envelope<P>) -> Self {
        InboundDelivery::Bare(envelope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
