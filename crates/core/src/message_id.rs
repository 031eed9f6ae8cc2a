//! Message identifier generation.
//!
//! Ids have the form `<channel>-<unix millis>-<suffix>` where the suffix is
//! nine random lowercase base36 characters. The millisecond timestamp keeps
//! ids roughly sortable; the suffix (36^9 ≈ 10^14 values) makes collisions
//! between concurrent callers within the same millisecond negligible.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::channels::ChannelType;

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 9;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Globally unique identifier of one logical communication request.
///
/// Stays the same across every redelivery of the same event, which makes it
/// the deduplication key for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh id for `channel`.
    pub fn generate(channel: ChannelType) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("{}-{millis}-{suffix}", channel.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use regex::Regex;

    use super::*;

    #[test]
    fn id_matches_channel_number_suffix_pattern() {
        let pattern = Regex::new(r"^(email|sms|push)-\d+-[0-9a-z]{9}$").unwrap();
        for channel in ChannelType::ALL {
            let id = MessageId::generate(channel);
            assert!(pattern.is_match(id.as_str()), "unexpected id format: {id}");
            assert!(id.as_str().starts_with(channel.as_str()));
        }
    }

    #[test]
    fn ids_are_unique_across_concurrent_callers() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let ids: Vec<MessageId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        (0..PER_THREAD)
                            .map(|_| MessageId::generate(ChannelType::Email))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().expect("generator thread panicked"))
                .collect()
        });

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), THREADS * PER_THREAD);
        assert_eq!(unique.len(), ids.len(), "duplicate message ids generated");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = MessageId::from("sms-1-abcdefghi".to_string());
        assert_eq!(serde_json::to_value(&id).unwrap(), "sms-1-abcdefghi");
    }
}
