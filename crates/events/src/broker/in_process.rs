//! In-process broker backed by bounded `tokio::sync::mpsc` queues.
//!
//! [`InProcessBroker`] stands in for the external bus when running locally.
//! Every subscriber gets its own queue and receives every [`BrokerEvent`];
//! the [`ConsumerHost`](crate::host::ConsumerHost) picks out the events it
//! has a consumer for.
//!
//! A full queue applies backpressure: `put_event` waits until the subscriber
//! makes room, so an acknowledged event is never dropped.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{BrokerEntry, BrokerError, BrokerEvent, BrokerReceipt, EventBroker};

/// Default queue capacity per subscriber.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Submissions fail with [`BrokerError::Unavailable`] when nothing is
/// subscribed, since the event could never be delivered.
pub struct InProcessBroker {
    name: String,
    capacity: usize,
    subscribers: Mutex<Vec<mpsc::Sender<BrokerEvent>>>,
}

impl InProcessBroker {
    /// Create a bus called `name` whose subscriber queues hold `capacity`
    /// events each.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Create a bus with the default capacity.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_CAPACITY)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to all events submitted from now on.
    ///
    /// The receiver yields `None` once the broker is dropped.
    pub fn subscribe(&self) -> mpsc::Receiver<BrokerEvent> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.lock_subscribers().push(sender);
        receiver
    }

    /// Live subscriber queues; closed ones are pruned.
    fn live_subscribers(&self) -> Vec<mpsc::Sender<BrokerEvent>> {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|sender| !sender.is_closed());
        subscribers.clone()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<BrokerEvent>>> {
        // The list stays consistent even if a holder panicked.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventBroker for InProcessBroker {
    async fn put_event(&self, entry: BrokerEntry) -> Result<BrokerReceipt, BrokerError> {
        if entry.event_bus_name != self.name {
            return Err(BrokerError::Unavailable(format!(
                "event bus '{}' does not exist",
                entry.event_bus_name
            )));
        }

        let event = BrokerEvent {
            id: Uuid::now_v7().to_string(),
            source: entry.source,
            detail_type: entry.detail_type,
            event_bus_name: entry.event_bus_name,
            time: chrono::Utc::now(),
            detail: serde_json::from_str(&entry.detail)?,
        };
        let event_id = event.id.clone();

        let mut delivered = 0usize;
        for subscriber in self.live_subscribers() {
            // Waits while the queue is full; fails only if the receiver is gone.
            if subscriber.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            return Err(BrokerError::Unavailable(
                "no consumers attached to the bus".into(),
            ));
        }

        Ok(BrokerReceipt {
            event_id: Some(event_id),
            rejection: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn entry(bus: &str) -> BrokerEntry {
        BrokerEntry {
            source: "communications.service".into(),
            detail_type: "SMSNotification".into(),
            detail: r#"{"to":"+15550001111","message":"Hello"}"#.into(),
            event_bus_name: bus.into(),
        }
    }

    #[tokio::test]
    async fn put_event_reaches_every_subscriber() {
        let broker = InProcessBroker::with_name("bus");
        let mut rx1 = broker.subscribe();
        let mut rx2 = broker.subscribe();

        let receipt = broker.put_event(entry("bus")).await.unwrap();

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(Some(e1.id.clone()), receipt.event_id);
        assert_eq!(e1, e2);
        assert_eq!(e1.detail_type, "SMSNotification");
        assert_eq!(e1.detail["to"], "+15550001111");
    }

    #[tokio::test]
    async fn full_queue_holds_the_publisher_instead_of_dropping() {
        let broker = InProcessBroker::new("bus", 2);
        let mut rx = broker.subscribe();

        broker.put_event(entry("bus")).await.unwrap();
        broker.put_event(entry("bus")).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), broker.put_event(entry("bus"))).await;
        assert!(blocked.is_err(), "third publish should wait for room");

        rx.recv().await.unwrap();
        broker.put_event(entry("bus")).await.unwrap();

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(rx.try_recv().is_err(), "the timed-out publish never enqueued");
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned() {
        let broker = InProcessBroker::with_name("bus");
        let rx = broker.subscribe();
        drop(rx);
        assert_matches!(
            broker.put_event(entry("bus")).await,
            Err(BrokerError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn receiver_ends_when_broker_is_dropped() {
        let broker = InProcessBroker::with_name("bus");
        let mut rx = broker.subscribe();
        broker.put_event(entry("bus")).await.unwrap();
        drop(broker);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn put_event_without_subscribers_is_unavailable() {
        let broker = InProcessBroker::with_name("bus");
        let result = broker.put_event(entry("bus")).await;
        assert_matches!(result, Err(BrokerError::Unavailable(_)));
    }

    #[tokio::test]
    async fn put_event_to_unknown_bus_is_unavailable() {
        let broker = InProcessBroker::with_name("bus");
        let _rx = broker.subscribe();
        let err = broker.put_event(entry("other-bus")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Event bus unavailable: event bus 'other-bus' does not exist"
        );
    }

    #[tokio::test]
    async fn put_event_rejects_non_json_detail() {
        let broker = InProcessBroker::with_name("bus");
        let _rx = broker.subscribe();
        let mut bad = entry("bus");
        bad.detail = "not json".into();
        assert_matches!(
            broker.put_event(bad).await,
            Err(BrokerError::InvalidDetail(_))
        );
    }

    #[test]
    fn delivered_event_serializes_in_wrapped_form() {
        let event = BrokerEvent {
            id: "1".into(),
            source: "communications.service".into(),
            detail_type: "EmailNotification".into(),
            event_bus_name: "bus".into(),
            time: chrono::Utc::now(),
            detail: serde_json::json!({"to": "a@b.com"}),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["detail-type"], "EmailNotification");
        assert_eq!(value["detail"]["to"], "a@b.com");
    }
}
