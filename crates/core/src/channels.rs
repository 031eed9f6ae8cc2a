//! Well-known delivery channels.
//!
//! Each channel owns exactly one broker detail type and one message id
//! prefix. Consumers are bound to a single channel, so routing by detail
//! type is total and unambiguous.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Broker detail type for email notifications.
pub const DETAIL_TYPE_EMAIL: &str = "EmailNotification";

/// Broker detail type for SMS notifications.
pub const DETAIL_TYPE_SMS: &str = "SMSNotification";

/// Broker detail type for push notifications.
pub const DETAIL_TYPE_PUSH: &str = "PushNotification";

/// The delivery channel of a communication request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Sms,
    Push,
}

impl ChannelType {
    /// Every channel, in a stable order.
    pub const ALL: [ChannelType; 3] = [ChannelType::Email, ChannelType::Sms, ChannelType::Push];

    /// Lowercase name, also used as the message id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Sms => "sms",
            ChannelType::Push => "push",
        }
    }

    /// The broker `detail-type` tag events of this channel are published under.
    pub fn detail_type(self) -> &'static str {
        match self {
            ChannelType::Email => DETAIL_TYPE_EMAIL,
            ChannelType::Sms => DETAIL_TYPE_SMS,
            ChannelType::Push => DETAIL_TYPE_PUSH,
        }
    }

    /// Resolve a broker `detail-type` tag back to its channel.
    pub fn from_detail_type(detail_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.detail_type() == detail_type)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(ChannelType::Email),
            "sms" => Ok(ChannelType::Sms),
            "push" => Ok(ChannelType::Push),
            other => Err(CoreError::Validation(format!(
                "Unknown channel '{other}'. Must be one of: email, sms, push"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_types_resolve_back_to_their_channel() {
        for channel in ChannelType::ALL {
            assert_eq!(
                ChannelType::from_detail_type(channel.detail_type()),
                Some(channel)
            );
        }
    }

    #[test]
    fn unknown_detail_type_resolves_to_none() {
        assert_eq!(ChannelType::from_detail_type("FaxNotification"), None);
        assert_eq!(ChannelType::from_detail_type("emailnotification"), None);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("SMS".parse::<ChannelType>().unwrap(), ChannelType::Sms);
        assert_eq!(" push ".parse::<ChannelType>().unwrap(), ChannelType::Push);
    }

    #[test]
    fn parse_rejects_unknown_channel() {
        let err = "fax".parse::<ChannelType>().unwrap_err();
        assert!(err.to_string().contains("Unknown channel 'fax'"));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_value(ChannelType::Sms).unwrap(), "sms");
    }
}
