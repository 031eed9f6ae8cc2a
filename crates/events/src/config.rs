//! Event bus configuration loaded from environment variables.

/// Default bus name when `EVENT_BUS_NAME` is not set.
pub const DEFAULT_EVENT_BUS_NAME: &str = "communications-event-bus";

/// Default region when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default producer name stamped on every published entry.
pub const DEFAULT_EVENT_SOURCE: &str = "communications.service";

/// Where and how events are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Logical bus name entries are submitted to.
    pub event_bus_name: String,
    /// Region reported by the stats endpoint.
    pub region: String,
    /// `Source` of every published entry.
    pub source: String,
    /// PutEvents endpoint. `None` selects the in-process broker.
    pub broker_url: Option<String>,
}

impl BusConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var          | Default                     |
    /// |------------------|-----------------------------|
    /// | `EVENT_BUS_NAME` | `communications-event-bus`  |
    /// | `AWS_REGION`     | `us-east-1`                 |
    /// | `EVENT_SOURCE`   | `communications.service`    |
    /// | `BROKER_URL`     | unset (in-process broker)   |
    pub fn from_env() -> Self {
        Self {
            event_bus_name: std::env::var("EVENT_BUS_NAME")
                .unwrap_or_else(|_| DEFAULT_EVENT_BUS_NAME.into()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.into()),
            source: std::env::var("EVENT_SOURCE").unwrap_or_else(|_| DEFAULT_EVENT_SOURCE.into()),
            broker_url: std::env::var("BROKER_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            event_bus_name: DEFAULT_EVENT_BUS_NAME.into(),
            region: DEFAULT_REGION.into(),
            source: DEFAULT_EVENT_SOURCE.into(),
            broker_url: None,
        }
    }
}

/// Whether mock delivery backends simulate provider latency.
///
/// Reads `MOCK_LATENCY`; anything other than `0`, `false` or `off` enables it.
pub fn mock_latency_enabled() -> bool {
    std::env::var("MOCK_LATENCY")
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"))
        .unwrap_or(true)
}
