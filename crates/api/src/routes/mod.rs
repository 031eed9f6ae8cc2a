pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::communications;
use crate::state::AppState;

/// Build the `/communications` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /communications/email                            publish email (POST)
/// /communications/sms                              publish SMS (POST)
/// /communications/push                             publish push notification (POST)
/// /communications/stats                            service status (GET)
/// ```
pub fn communication_routes() -> Router<AppState> {
    Router::new()
        .route("/communications/email", post(communications::send_email))
        .route("/communications/sms", post(communications::send_sms))
        .route("/communications/push", post(communications::send_push))
        .route("/communications/stats", get(communications::stats))
}
