//! In-process event bus wiring for local development.
//!
//! When no remote broker is configured, the API publishes to an
//! [`InProcessBroker`] and a [`ConsumerHost`] in the same process delivers
//! the events. Dead letters are logged.

use std::sync::Arc;
use std::time::Duration;

use courier_core::channels::ChannelType;
use courier_core::error::CoreError;
use courier_events::{
    build_consumer, BackendOptions, BusConfig, ConsumerHost, DeadLetter, InProcessBroker,
    RedeliveryPolicy,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long shutdown waits for in-flight deliveries.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Options for the local consumers.
#[derive(Debug, Clone)]
pub struct LocalBusOptions {
    pub policy: RedeliveryPolicy,
    pub backends: BackendOptions,
}

impl LocalBusOptions {
    pub fn from_env() -> Self {
        Self {
            policy: RedeliveryPolicy::from_env(),
            backends: BackendOptions::from_env(),
        }
    }
}

/// A running in-process bus and its consumers.
pub struct LocalBus {
    pub broker: Arc<InProcessBroker>,
    cancel: CancellationToken,
    host_handle: JoinHandle<()>,
    dead_letter_handle: JoinHandle<()>,
}

impl LocalBus {
    /// Create the bus, register one consumer per channel and start delivering.
    pub fn start(bus: &BusConfig, options: LocalBusOptions) -> Result<Self, CoreError> {
        let broker = Arc::new(InProcessBroker::with_name(bus.event_bus_name.clone()));

        let (mut host, dead_letters) = ConsumerHost::new(options.policy);
        for channel in ChannelType::ALL {
            let target = build_consumer(channel, &options.backends)
                .map_err(|e| CoreError::Internal(format!("{channel} backend: {e}")))?;
            host = host.register_shared(target)?;
        }

        tracing::info!(channels = ?host.channels(), "Local consumers registered");

        let cancel = CancellationToken::new();
        let host_handle = tokio::spawn(host.run(broker.subscribe(), cancel.clone()));
        let dead_letter_handle = tokio::spawn(log_dead_letters(dead_letters));

        Ok(Self {
            broker,
            cancel,
            host_handle,
            dead_letter_handle,
        })
    }

    /// Stop accepting events and wait briefly for in-flight deliveries.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, self.host_handle).await;
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, self.dead_letter_handle).await;
        tracing::info!("Local event bus shut down");
    }
}

async fn log_dead_letters(mut receiver: mpsc::UnboundedReceiver<DeadLetter>) {
    while let Some(letter) = receiver.recv().await {
        tracing::error!(
            event_id = %letter.event.id,
            detail_type = %letter.event.detail_type,
            attempts = letter.attempts,
            reason = %letter.reason,
            "Event dead-lettered"
        );
    }
}
