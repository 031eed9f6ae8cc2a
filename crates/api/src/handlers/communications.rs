//! Handlers for the `/communications` resource.
//!
//! Each send endpoint validates the request, builds an [`Envelope`] and
//! hands it to the [`Publisher`](courier_events::Publisher). Delivery
//! happens asynchronously; the response only carries the `messageId` the
//! caller can use for correlation.

use axum::extract::State;
use axum::Json;
use courier_core::channels::ChannelType;
use courier_core::validation::require_fields;
use courier_events::envelope::DEFAULT_FROM_ADDRESS;
use courier_events::{ChannelPayload, EmailPayload, Envelope, PushPayload, SmsPayload};
use serde::{Deserialize, Serialize};

use crate::error::{AppJson, AppResult};
use crate::state::AppState;

/// Service name reported by the stats endpoint.
pub const SERVICE_NAME: &str = "communications-microservice";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /communications/email`.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub from: Option<String>,
}

/// Body of `POST /communications/sms`.
#[derive(Debug, Deserialize)]
pub struct SmsRequest {
    pub to: Option<String>,
    pub message: Option<String>,
}

/// Body of `POST /communications/push`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub device_token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Response of every send endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
    pub message_id: String,
}

/// Response of `GET /communications/stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub event_bus: String,
    pub region: String,
    /// Seconds since the process started.
    pub uptime: f64,
}

// ---------------------------------------------------------------------------
// Send endpoints
// ---------------------------------------------------------------------------

/// POST /communications/email
pub async fn send_email(
    State(state): State<AppState>,
    AppJson(input): AppJson<EmailRequest>,
) -> AppResult<Json<SendResponse>> {
    require_fields(&[
        ("to", input.to.as_deref()),
        ("subject", input.subject.as_deref()),
        ("body", input.body.as_deref()),
    ])?;

    let payload = EmailPayload {
        to: input.to.unwrap_or_default(),
        subject: input.subject.unwrap_or_default(),
        body: input.body.unwrap_or_default(),
        from: input
            .from
            .filter(|from| !from.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
    };

    publish(&state, payload).await
}

/// POST /communications/sms
pub async fn send_sms(
    State(state): State<AppState>,
    AppJson(input): AppJson<SmsRequest>,
) -> AppResult<Json<SendResponse>> {
    require_fields(&[
        ("to", input.to.as_deref()),
        ("message", input.message.as_deref()),
    ])?;

    let payload = SmsPayload {
        to: input.to.unwrap_or_default(),
        message: input.message.unwrap_or_default(),
    };

    publish(&state, payload).await
}

/// POST /communications/push
pub async fn send_push(
    State(state): State<AppState>,
    AppJson(input): AppJson<PushRequest>,
) -> AppResult<Json<SendResponse>> {
    require_fields(&[
        ("deviceToken", input.device_token.as_deref()),
        ("title", input.title.as_deref()),
        ("body", input.body.as_deref()),
    ])?;

    let payload = PushPayload {
        device_token: input.device_token.unwrap_or_default(),
        title: input.title.unwrap_or_default(),
        body: input.body.unwrap_or_default(),
        data: input
            .data
            .filter(|data| !data.is_null())
            .unwrap_or_else(|| serde_json::json!({})),
    };

    publish(&state, payload).await
}

/// Wrap a validated payload in an envelope and publish it.
async fn publish<P: ChannelPayload>(
    state: &AppState,
    payload: P,
) -> AppResult<Json<SendResponse>> {
    let envelope = Envelope::new(payload);
    let receipt = state.publisher.publish(&envelope).await?;

    Ok(Json(SendResponse {
        success: true,
        message: accepted_message(P::CHANNEL),
        message_id: receipt.message_id.to_string(),
    }))
}

fn accepted_message(channel: ChannelType) -> String {
    let what = match channel {
        ChannelType::Email => "Email",
        ChannelType::Sms => "SMS",
        ChannelType::Push => "Push notification",
    };
    format!("{what} sent to the event bus")
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// GET /communications/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        service: SERVICE_NAME,
        status: "running",
        event_bus: state.bus.event_bus_name.clone(),
        region: state.bus.region.clone(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
