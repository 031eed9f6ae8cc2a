use std::sync::Arc;
use std::time::Instant;

use courier_events::{BusConfig, Publisher};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Event bus configuration (reported by the stats endpoint).
    pub bus: Arc<BusConfig>,
    /// Publisher wrapping the process-wide broker client.
    pub publisher: Arc<Publisher>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}
