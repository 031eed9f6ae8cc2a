//! SMS delivery through a simulated provider.

use std::time::Duration;

use super::{DeliveryBackend, DeliveryError, DeliveryResult};
use crate::envelope::{Envelope, SmsPayload};

/// Provider name reported by the mock backend.
pub const MOCK_SMS_PROVIDER: &str = "mock-sms-provider";

/// Simulated provider latency.
const MOCK_SMS_LATENCY: Duration = Duration::from_millis(150);

/// Flat per-message cost reported by the mock provider.
const MOCK_SMS_COST: f64 = 0.01;

/// Characters of the message body that appear in logs.
const LOGGED_MESSAGE_PREFIX: usize = 50;

/// Pretends to send SMS after a short delay.
#[derive(Debug, Clone)]
pub struct MockSmsBackend {
    latency: Duration,
}

impl MockSmsBackend {
    pub fn new() -> Self {
        Self {
            latency: MOCK_SMS_LATENCY,
        }
    }

    /// Override the simulated latency (zero disables it).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MockSmsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryBackend for MockSmsBackend {
    type Payload = SmsPayload;

    fn provider(&self) -> &'static str {
        MOCK_SMS_PROVIDER
    }

    async fn send(&self, envelope: &Envelope<SmsPayload>) -> Result<DeliveryResult, DeliveryError> {
        tokio::time::sleep(self.latency).await;

        let sms = envelope.payload();
        let preview: String = sms.message.chars().take(LOGGED_MESSAGE_PREFIX).collect();
        tracing::info!(
            message_id = %envelope.message_id(),
            to = %sms.to,
            message_length = sms.message.chars().count(),
            preview = %preview,
            "SMS sent"
        );

        Ok(DeliveryResult {
            delivered: true,
            provider: MOCK_SMS_PROVIDER.to_string(),
            estimated_delivery_time: "10-30 seconds".to_string(),
            platform: None,
            cost: Some(MOCK_SMS_COST),
        })
    }
}
