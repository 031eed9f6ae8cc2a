//! Broker client for a PutEvents-style HTTP endpoint.
//!
//! [`HttpBroker`] POSTs one entry per call:
//!
//! ```json
//! { "Entries": [ { "Source": "...", "DetailType": "...", "Detail": "...", "EventBusName": "..." } ] }
//! ```
//!
//! and reads back `FailedEntryCount` plus the per-entry `EventId` or
//! `ErrorCode`/`ErrorMessage`. It never retries; a failed call surfaces to
//! the publisher as-is.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{BrokerEntry, BrokerError, BrokerReceipt, EntryRejection, EventBroker};

/// HTTP request timeout for a single submission.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsRequest<'a> {
    entries: [PutEventsRequestEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsRequestEntry<'a> {
    source: &'a str,
    detail_type: &'a str,
    detail: &'a str,
    event_bus_name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsResponse {
    #[serde(default)]
    failed_entry_count: u32,
    #[serde(default)]
    entries: Vec<PutEventsResultEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutEventsResultEntry {
    event_id: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
}

impl From<PutEventsResponse> for BrokerReceipt {
    fn from(response: PutEventsResponse) -> Self {
        let first = response.entries.into_iter().next().unwrap_or_default();
        let rejection = (response.failed_entry_count > 0 || first.error_code.is_some()).then(|| {
            EntryRejection {
                code: first.error_code.unwrap_or_else(|| "Unknown".to_string()),
                message: first.error_message.unwrap_or_default(),
            }
        });
        BrokerReceipt {
            event_id: first.event_id,
            rejection,
        }
    }
}

/// Submits events to a remote broker over HTTP.
pub struct HttpBroker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBroker {
    /// Create a client for the PutEvents endpoint at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, BrokerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventBroker for HttpBroker {
    async fn put_event(&self, entry: BrokerEntry) -> Result<BrokerReceipt, BrokerError> {
        let request = PutEventsRequest {
            entries: [PutEventsRequestEntry {
                source: &entry.source,
                detail_type: &entry.detail_type,
                detail: &entry.detail,
                event_bus_name: &entry.event_bus_name,
            }],
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BrokerError::Throttled(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(BrokerError::Unavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: PutEventsResponse = response.json().await?;
        Ok(body.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
