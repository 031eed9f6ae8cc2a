//! Local invocation host for the in-process broker.
//!
//! [`ConsumerHost`] plays the role the external broker plays in production:
//! it receives every [`BrokerEvent`], routes it by `detail-type` to the one
//! consumer registered for that channel, and applies the retry contract.
//!
//! - Each event is handled on its own task; there is no ordering between
//!   events.
//! - Retryable failures are redelivered with exponential backoff until
//!   [`RedeliveryPolicy::max_attempts`] is reached.
//! - Exhausted, non-retryable and unroutable events are dead-lettered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier_core::channels::ChannelType;
use courier_core::error::CoreError;
use courier_core::types::Timestamp;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::broker::BrokerEvent;
use crate::consumer::InvocationTarget;

// ---------------------------------------------------------------------------
// RedeliveryPolicy
// ---------------------------------------------------------------------------

/// Default number of attempts per event, including the first.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first redelivery; doubles on each further one.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How often, and how patiently, a failed event is redelivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RedeliveryPolicy {
    /// Load the policy from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `MAX_DELIVERY_ATTEMPTS`    | `3`     |
    /// | `REDELIVERY_BASE_DELAY_MS` | `1000`  |
    pub fn from_env() -> Self {
        let max_attempts = std::env::var("MAX_DELIVERY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let base_delay = std::env::var("REDELIVERY_BASE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BASE_DELAY);
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before redelivering after failed attempt number `attempt`
    /// (1-based): 1x, 2x, 4x ... the base delay.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

// ---------------------------------------------------------------------------
// DeadLetter
// ---------------------------------------------------------------------------

/// An event the host gave up on.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub event: BrokerEvent,
    pub reason: String,
    /// Attempts made before giving up (zero if the event was unroutable).
    pub attempts: u32,
    pub failed_at: Timestamp,
}

impl DeadLetter {
    fn new(event: BrokerEvent, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            event,
            reason: reason.into(),
            attempts,
            failed_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsumerHost
// ---------------------------------------------------------------------------

/// Routes broker events to consumers and enforces the retry contract.
pub struct ConsumerHost {
    targets: HashMap<&'static str, Arc<dyn InvocationTarget>>,
    policy: RedeliveryPolicy,
    dead_letters: mpsc::UnboundedSender<DeadLetter>,
}

impl ConsumerHost {
    /// Create a host with no consumers.
    ///
    /// Dead letters are sent to the returned receiver.
    pub fn new(policy: RedeliveryPolicy) -> (Self, mpsc::UnboundedReceiver<DeadLetter>) {
        let (dead_letters, rx) = mpsc::unbounded_channel();
        let host = Self {
            targets: HashMap::new(),
            policy,
            dead_letters,
        };
        (host, rx)
    }

    /// Register the consumer for its channel.
    ///
    /// Fails if a consumer for the same channel is already registered, so
    /// that every detail type maps to exactly one consumer.
    pub fn register<T>(self, target: T) -> Result<Self, CoreError>
    where
        T: InvocationTarget + 'static,
    {
        self.register_shared(Arc::new(target))
    }

    /// [`register`](Self::register) for an already shared target.
    pub fn register_shared(mut self, target: Arc<dyn InvocationTarget>) -> Result<Self, CoreError> {
        let channel = target.channel();
        let detail_type = channel.detail_type();
        if self.targets.contains_key(detail_type) {
            return Err(CoreError::Internal(format!(
                "a consumer for channel '{channel}' is already registered"
            )));
        }
        self.targets.insert(detail_type, target);
        Ok(self)
    }

    /// Channels that have a registered consumer.
    pub fn channels(&self) -> Vec<ChannelType> {
        let mut channels: Vec<ChannelType> =
            self.targets.values().map(|target| target.channel()).collect();
        channels.sort_by_key(|channel| channel.as_str());
        channels
    }

    /// Run the dispatch loop.
    ///
    /// Exits when the bus is closed or `cancel` fires, then waits for
    /// in-flight invocations (including pending redeliveries) to finish.
    pub async fn run(
        self,
        mut receiver: mpsc::Receiver<BrokerEvent>,
        cancel: CancellationToken,
    ) {
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Consumer host cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Some(event) => self.dispatch(&tracker, event),
                    None => {
                        tracing::info!("Event bus closed, consumer host shutting down");
                        break;
                    }
                },
            }
        }

        tracker.close();
        tracker.wait().await;
    }

    fn dispatch(&self, tracker: &TaskTracker, event: BrokerEvent) {
        let Some(target) = self.targets.get(event.detail_type.as_str()) else {
            tracing::warn!(
                detail_type = %event.detail_type,
                event_id = %event.id,
                "No consumer for detail type, dead-lettering event"
            );
            let reason = format!("no consumer for detail type '{}'", event.detail_type);
            self.dead_letter(DeadLetter::new(event, reason, 0));
            return;
        };

        let target = Arc::clone(target);
        let policy = self.policy;
        let dead_letters = self.dead_letters.clone();
        tracker.spawn(async move {
            if let Some(letter) = deliver(target, event, policy).await {
                let _ = dead_letters.send(letter);
            }
        });
    }

    fn dead_letter(&self, letter: DeadLetter) {
        // The receiver may have been dropped; the event is logged either way.
        let _ = self.dead_letters.send(letter);
    }
}

/// Invoke `target` until it succeeds or the policy gives up.
///
/// Returns the dead letter when it gives up.
async fn deliver(
    target: Arc<dyn InvocationTarget>,
    event: BrokerEvent,
    policy: RedeliveryPolicy,
) -> Option<DeadLetter> {
    let mut attempt = 1;
    loop {
        // Consumers receive the wrapped form, exactly as a remote broker sends it.
        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(e) => return Some(DeadLetter::new(event, e.to_string(), attempt)),
        };

        match target.invoke(payload).await {
            Ok(processed) => {
                tracing::info!(
                    message_id = %processed.message_id,
                    event_id = %event.id,
                    attempt,
                    "Event processed"
                );
                return None;
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    error = %e,
                    event_id = %event.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Delivery attempt failed, redelivering"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_id = %event.id,
                    attempt,
                    retryable = e.is_retryable(),
                    "Delivery failed, dead-lettering event"
                );
                return Some(DeadLetter::new(event, e.to_string(), attempt));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
