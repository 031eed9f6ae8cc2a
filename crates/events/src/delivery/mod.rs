//! Delivery backends.
//!
//! A [`DeliveryBackend`] performs the physical send for one channel. The
//! generic [`Consumer`](crate::consumer::Consumer) drives any backend
//! through the same validate-then-send sequence.
//!
//! - [`email`]: mock provider and an SMTP backend.
//! - [`sms`]: mock provider.
//! - [`push`]: mock provider.

pub mod email;
pub mod push;
pub mod sms;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use courier_core::channels::ChannelType;
use courier_core::error::CoreError;
use serde::{Deserialize, Serialize};

use crate::config::mock_latency_enabled;
use crate::consumer::{Consumer, InvocationTarget};
use crate::envelope::{ChannelPayload, Envelope};

pub use email::{EmailConfig, MockEmailBackend, SmtpEmailBackend};
pub use push::MockPushBackend;
pub use sms::MockSmsBackend;

// ---------------------------------------------------------------------------
// DeliveryResult
// ---------------------------------------------------------------------------

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub delivered: bool,
    /// Identifier of the backend that handled the send.
    pub provider: String,
    /// Informational only.
    pub estimated_delivery_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Provider cost of the send, when the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// A send that did not go through. Always eligible for redelivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The provider refused or failed the send.
    #[error("Provider {provider} failed: {reason}")]
    Provider {
        provider: &'static str,
        reason: String,
    },

    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// DeliveryBackend
// ---------------------------------------------------------------------------

/// Transport for a single channel.
///
/// `send` is the only step allowed to suspend; it must not hold any lock
/// across the await.
pub trait DeliveryBackend: Send + Sync + 'static {
    type Payload: ChannelPayload;

    /// Provider identifier reported in [`DeliveryResult::provider`].
    fn provider(&self) -> &'static str;

    /// Consumer-side sanity check of the delivered payload.
    fn validate(&self, payload: &Self::Payload) -> Result<(), CoreError> {
        payload.validate()
    }

    /// Perform the send.
    fn send(
        &self,
        envelope: &Envelope<Self::Payload>,
    ) -> impl Future<Output = Result<DeliveryResult, DeliveryError>> + Send;
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Which backend each channel's consumer uses.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Whether mock backends simulate provider latency.
    pub mock_latency: bool,
    /// Send email over SMTP instead of the mock provider.
    pub smtp: Option<EmailConfig>,
}

impl BackendOptions {
    /// Load options from `MOCK_LATENCY` and the `SMTP_*` variables.
    pub fn from_env() -> Self {
        Self {
            mock_latency: mock_latency_enabled(),
            smtp: EmailConfig::from_env(),
        }
    }

    /// Mock backends without simulated latency and no SMTP.
    pub fn instant_mocks() -> Self {
        Self {
            mock_latency: false,
            smtp: None,
        }
    }
}

/// Build the consumer for `channel`.
///
/// Email goes over SMTP when configured; everything else uses the mock
/// providers.
pub fn build_consumer(
    channel: ChannelType,
    options: &BackendOptions,
) -> Result<Arc<dyn InvocationTarget>, DeliveryError> {
    let latency_override = (!options.mock_latency).then_some(Duration::ZERO);

    let target: Arc<dyn InvocationTarget> = match channel {
        ChannelType::Email => match &options.smtp {
            Some(config) => {
                tracing::info!(smtp_host = %config.smtp_host, "Email consumer using SMTP");
                Arc::new(Consumer::new(SmtpEmailBackend::new(config)?))
            }
            None => {
                let mut backend = MockEmailBackend::new();
                if let Some(latency) = latency_override {
                    backend = backend.with_latency(latency);
                }
                Arc::new(Consumer::new(backend))
            }
        },
        ChannelType::Sms => {
            let mut backend = MockSmsBackend::new();
            if let Some(latency) = latency_override {
                backend = backend.with_latency(latency);
            }
            Arc::new(Consumer::new(backend))
        }
        ChannelType::Push => {
            let mut backend = MockPushBackend::new();
            if let Some(latency) = latency_override {
                backend = backend.with_latency(latency);
            }
            Arc::new(Consumer::new(backend))
        }
    };

    Ok(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
