//! Shared domain types for the communications pipeline.
//!
//! - [`channels`]: the closed set of delivery channels and their broker tags.
//! - [`message_id`]: globally unique message identifier generation.
//! - [`validation`]: required-field checks shared by ingress and consumers.
//! - [`error`]: the domain error type.

pub mod channels;
pub mod error;
pub mod message_id;
pub mod types;
pub mod validation;
