//! Push notification delivery through a simulated provider.

use std::time::Duration;

use super::{DeliveryBackend, DeliveryError, DeliveryResult};
use crate::envelope::{ChannelPayload, Envelope, PushPayload};

/// Provider name reported by the mock backend.
pub const MOCK_PUSH_PROVIDER: &str = "mock-push-provider";

/// Simulated provider latency.
const MOCK_PUSH_LATENCY: Duration = Duration::from_millis(80);

/// Pretends to send push notifications after a short delay.
#[derive(Debug, Clone)]
pub struct MockPushBackend {
    latency: Duration,
}

impl MockPushBackend {
    pub fn new() -> Self {
        Self {
            latency: MOCK_PUSH_LATENCY,
        }
    }

    /// Override the simulated latency (zero disables it).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MockPushBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryBackend for MockPushBackend {
    type Payload = PushPayload;

    fn provider(&self) -> &'static str {
        MOCK_PUSH_PROVIDER
    }

    async fn send(
        &self,
        envelope: &Envelope<PushPayload>,
    ) -> Result<DeliveryResult, DeliveryError> {
        tokio::time::sleep(self.latency).await;

        let push = envelope.payload();
        tracing::info!(
            message_id = %envelope.message_id(),
            device = %push.log_recipient(),
            title = %push.title,
            "Push notification sent"
        );

        Ok(DeliveryResult {
            delivered: true,
            provider: MOCK_PUSH_PROVIDER.to_string(),
            estimated_delivery_time: "instant".to_string(),
            platform: Some("ios/android".to_string()),
            cost: None,
        })
    }
}
