//! Event envelopes and their channel-specific payloads.
//!
//! An [`Envelope`] is the immutable unit of work that travels through the
//! broker. Its serialized form is the event `detail`: the payload fields
//! flattened next to `timestamp` and `messageId`.
//!
//! ```text
//! Email: to, subject, body, from, timestamp, messageId
//! SMS:   to, message, timestamp, messageId
//! Push:  deviceToken, title, body, data, timestamp, messageId
//! ```

use courier_core::channels::ChannelType;
use courier_core::error::CoreError;
use courier_core::message_id::MessageId;
use courier_core::types::Timestamp;
use courier_core::validation::require_fields;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Sender address used when an email request does not specify one.
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@example.com";

// ---------------------------------------------------------------------------
// ChannelPayload
// ---------------------------------------------------------------------------

/// A payload type bound to exactly one delivery channel.
///
/// The associated constant is what makes routing total: a payload cannot be
/// published under, or consumed by, any channel other than its own.
pub trait ChannelPayload:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    const CHANNEL: ChannelType;

    /// Check that every required field is present.
    fn validate(&self) -> Result<(), CoreError>;

    /// Recipient description safe to put in logs.
    fn log_recipient(&self) -> String;
}

/// Payload of an email notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailPayload {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_from")]
    pub from: String,
}

fn default_from() -> String {
    DEFAULT_FROM_ADDRESS.to_string()
}

impl ChannelPayload for EmailPayload {
    const CHANNEL: ChannelType = ChannelType::Email;

    fn validate(&self) -> Result<(), CoreError> {
        require_fields(&[
            ("to", Some(self.to.as_str())),
            ("subject", Some(self.subject.as_str())),
            ("body", Some(self.body.as_str())),
        ])
    }

    fn log_recipient(&self) -> String {
        self.to.clone()
    }
}

/// Payload of an SMS notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsPayload {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
}

impl ChannelPayload for SmsPayload {
    const CHANNEL: ChannelType = ChannelType::Sms;

    fn validate(&self) -> Result<(), CoreError> {
        require_fields(&[
            ("to", Some(self.to.as_str())),
            ("message", Some(self.message.as_str())),
        ])
    }

    fn log_recipient(&self) -> String {
        self.to.clone()
    }
}

/// Number of device token characters that may appear in logs.
const LOGGED_TOKEN_PREFIX: usize = 20;

/// Payload of a push notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default)]
    pub device_token: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Free-form data forwarded to the device. Defaults to `{}`.
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl ChannelPayload for PushPayload {
    const CHANNEL: ChannelType = ChannelType::Push;

    fn validate(&self) -> Result<(), CoreError> {
        require_fields(&[
            ("deviceToken", Some(self.device_token.as_str())),
            ("title", Some(self.title.as_str())),
            ("body", Some(self.body.as_str())),
        ])
    }

    fn log_recipient(&self) -> String {
        let prefix: String = self.device_token.chars().take(LOGGED_TOKEN_PREFIX).collect();
        format!("{prefix}...")
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// An immutable, uniquely identified communication event.
///
/// Fields are private; the only way to obtain an envelope is
/// [`Envelope::new`] (which assigns a fresh [`MessageId`]) or decoding one
/// that was already published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<P> {
    #[serde(flatten)]
    payload: P,
    timestamp: Timestamp,
    message_id: MessageId,
}

impl<P: ChannelPayload> Envelope<P> {
    /// Wrap an already validated payload, assigning its message id.
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            timestamp: chrono::Utc::now(),
            message_id: MessageId::generate(P::CHANNEL),
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn channel(&self) -> ChannelType {
        P::CHANNEL
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Construction time. Informational only.
    pub fn created_at(&self) -> Timestamp {
        self.timestamp
    }

    /// Serialize the envelope as the broker `detail` string.
    pub fn to_detail(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
