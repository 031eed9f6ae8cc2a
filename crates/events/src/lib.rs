//! Event dispatch and delivery pipeline for communication requests.
//!
//! - [`Envelope`]: the immutable, uniquely identified event, generic over
//!   its channel payload ([`EmailPayload`], [`SmsPayload`], [`PushPayload`]).
//! - [`Publisher`]: hands envelopes to an [`EventBroker`].
//! - [`InboundDelivery`]: normalizes bare and wrapped broker deliveries.
//! - [`Consumer`]: runs one delivery attempt through a [`DeliveryBackend`].
//! - [`ConsumerHost`]: routes in-process broker events to consumers and
//!   applies redelivery and dead-lettering.

pub mod broker;
pub mod config;
pub mod consumer;
pub mod delivery;
pub mod envelope;
pub mod host;
pub mod publisher;
pub mod router;

pub use broker::{BrokerError, BrokerEvent, EventBroker, HttpBroker, InProcessBroker};
pub use config::BusConfig;
pub use consumer::{Consumer, ConsumerError, InvocationTarget, ProcessedMessage};
pub use delivery::{build_consumer, BackendOptions, DeliveryBackend, DeliveryError, DeliveryResult};
pub use envelope::{ChannelPayload, EmailPayload, Envelope, PushPayload, SmsPayload};
pub use host::{ConsumerHost, DeadLetter, RedeliveryPolicy};
pub use publisher::{PublishError, PublishReceipt, Publisher};
pub use router::InboundDelivery;
