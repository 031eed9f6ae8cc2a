//! Per-invocation consumer adapter.
//!
//! A serverless-style runtime starts `courier-worker` once per delivered
//! event: the event JSON (bare envelope or broker-wrapped) arrives on stdin
//! and the invocation response is written to stdout. Which consumer runs is
//! chosen by the first CLI argument or the `CONSUMER_CHANNEL` variable.
//! A failed invocation exits with [`EXIT_RETRYABLE`] or [`EXIT_POISON`].

use std::sync::Arc;

use courier_core::channels::ChannelType;
use courier_core::error::CoreError;
use courier_events::{BackendOptions, ConsumerError, DeliveryError, InvocationTarget};
use serde::Serialize;

/// Status code reported for a processed message.
pub const STATUS_OK: u16 = 200;

/// Exit code for a failure the runtime should redeliver.
pub const EXIT_RETRYABLE: i32 = 1;

/// Exit code for a failure no redelivery can fix.
pub const EXIT_POISON: i32 = 2;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// No channel given, or not one of email/sms/push.
    #[error(transparent)]
    Channel(#[from] CoreError),

    /// The SMTP transport could not be built.
    #[error("Failed to set up email backend: {0}")]
    Backend(#[from] DeliveryError),

    /// The invocation payload was not JSON.
    #[error("Invocation payload is not valid JSON: {0}")]
    Input(#[source] serde_json::Error),

    /// The consumer reported a failed attempt.
    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    #[error("Failed to encode invocation response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl WorkerError {
    /// Whether the runtime should redeliver the event.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Consumer(e) => e.is_retryable(),
            WorkerError::Backend(_) => true,
            WorkerError::Channel(_) | WorkerError::Input(_) | WorkerError::Encode(_) => false,
        }
    }

    /// Process exit code reported to the runtime.
    pub fn exit_code(&self) -> i32 {
        if self.is_retryable() {
            EXIT_RETRYABLE
        } else {
            EXIT_POISON
        }
    }
}

/// Resolve the channel from the CLI argument, falling back to the env value.
pub fn resolve_channel(
    arg: Option<&str>,
    env_value: Option<&str>,
) -> Result<ChannelType, WorkerError> {
    let raw = arg.or(env_value).ok_or_else(|| {
        CoreError::Validation(
            "No channel given. Pass one of email, sms, push or set CONSUMER_CHANNEL".into(),
        )
    })?;
    Ok(raw.trim().parse()?)
}

/// Build the consumer for `channel`.
pub fn build_consumer(
    channel: ChannelType,
    options: &BackendOptions,
) -> Result<Arc<dyn InvocationTarget>, WorkerError> {
    Ok(courier_events::build_consumer(channel, options)?)
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Response handed back to the invoking runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    /// JSON-encoded [`ProcessedMessage`](courier_events::ProcessedMessage).
    pub body: String,
}

/// Run one invocation from raw input bytes.
pub async fn invoke(
    target: &dyn InvocationTarget,
    input: &[u8],
) -> Result<InvocationResponse, WorkerError> {
    let payload: serde_json::Value = serde_json::from_slice(input).map_err(WorkerError::Input)?;
    let processed = target.invoke(payload).await?;

    Ok(InvocationResponse {
        status_code: STATUS_OK,
        body: serde_json::to_string(&processed).map_err(WorkerError::Encode)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use courier_events::{Envelope, ProcessedMessage, PushPayload, SmsPayload};
    use serde_json::json;

    use super::*;

    fn options() -> BackendOptions {
        BackendOptions::instant_mocks()
    }

    #[test]
    fn argument_takes_precedence_over_env() {
        let channel = resolve_channel(Some("push"), Some("email")).unwrap();
        assert_eq!(channel, ChannelType::Push);
    }

    #[test]
    fn env_value_used_without_argument() {
        let channel = resolve_channel(None, Some(" sms ")).unwrap();
        assert_eq!(channel, ChannelType::Sms);
    }

    #[test]
    fn unknown_or_missing_channel_is_rejected() {
        assert_matches!(
            resolve_channel(Some("fax"), None),
            Err(WorkerError::Channel(CoreError::Validation(_)))
        );
        assert_matches!(
            resolve_channel(None, None),
            Err(WorkerError::Channel(CoreError::Validation(_)))
        );
    }

    #[tokio::test]
    async fn sms_invocation_returns_processed_body() {
        let target = build_consumer(ChannelType::Sms, &options()).unwrap();
        let envelope = Envelope::new(SmsPayload {
            to: "+15551234567".into(),
            message: "hi".into(),
        });
        let input = serde_json::to_vec(&json!({
            "id": "evt-1",
            "source": "communications.service",
            "detail-type": "SMSNotification",
            "detail": envelope,
        }))
        .unwrap();

        let response = invoke(target.as_ref(), &input).await.unwrap();

        assert_eq!(response.status_code, 200);
        let processed: ProcessedMessage = serde_json::from_str(&response.body).unwrap();
        assert!(processed.success);
        assert_eq!(processed.status, "processed");
        assert_eq!(&processed.message_id, envelope.message_id());
        assert_eq!(processed.result.cost, Some(0.01));
    }

    #[tokio::test]
    async fn push_invocation_accepts_bare_envelope() {
        let target = build_consumer(ChannelType::Push, &options()).unwrap();
        let envelope = Envelope::new(PushPayload {
            device_token: "token-1234567890abcdefghij".into(),
            title: "T".into(),
            body: "B".into(),
            data: json!({}),
        });
        let input = serde_json::to_vec(&envelope).unwrap();

        let response = invoke(target.as_ref(), &input).await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["result"]["platform"], "ios/android");
        assert_eq!(body["messageId"], envelope.message_id().as_str());
    }

    #[test]
    fn response_uses_runtime_field_names() {
        let response = InvocationResponse {
            status_code: 200,
            body: "{}".into(),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"statusCode": 200, "body": "{}"})
        );
    }

    #[tokio::test]
    async fn non_json_input_is_rejected() {
        let target = build_consumer(ChannelType::Email, &options()).unwrap();
        let err = invoke(target.as_ref(), b"not json").await.unwrap_err();
        assert_matches!(err, WorkerError::Input(_));
        assert!(!err.is_retryable());
        assert_eq!(err.exit_code(), EXIT_POISON);
    }

    #[tokio::test]
    async fn wrong_channel_payload_is_not_retryable() {
        let target = build_consumer(ChannelType::Email, &options()).unwrap();
        let err = invoke(target.as_ref(), br#"{"to": "+1555", "message": "hi"}"#)
            .await
            .unwrap_err();
        assert_matches!(err, WorkerError::Consumer(_));
        assert!(!err.is_retryable());
        assert_eq!(err.exit_code(), EXIT_POISON);
    }

    #[test]
    fn delivery_failure_exits_as_retryable() {
        let err = WorkerError::Consumer(ConsumerError::Delivery {
            message_id: "sms-1-aaaaaaaaa".to_string().into(),
            source: DeliveryError::Provider {
                provider: "mock-sms-provider",
                reason: "timeout".into(),
            },
        });
        assert!(err.is_retryable());
        assert_eq!(err.exit_code(), EXIT_RETRYABLE);
    }

    #[test]
    fn unknown_channel_exits_as_poison() {
        let err = resolve_channel(Some("fax"), None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_POISON);
    }
}
