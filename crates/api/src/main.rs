use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_api::config::ServerConfig;
use courier_api::local_bus::{LocalBus, LocalBusOptions};
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_events::{BusConfig, EventBroker, HttpBroker, Publisher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let started_at = Instant::now();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_api=debug,courier_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let bus = BusConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(event_bus = %bus.event_bus_name, region = %bus.region, "Loaded event bus configuration");

    // --- Broker client (one per process) ---
    let (broker, local_bus): (Arc<dyn EventBroker>, Option<LocalBus>) = match &bus.broker_url {
        Some(url) => {
            let http = HttpBroker::new(url.clone()).expect("Failed to build broker HTTP client");
            tracing::info!(endpoint = %http.endpoint(), "Publishing to remote event bus");
            let broker: Arc<dyn EventBroker> = Arc::new(http);
            (broker, None)
        }
        None => {
            let local = LocalBus::start(&bus, LocalBusOptions::from_env())
                .expect("Failed to start local event bus");
            let broker: Arc<dyn EventBroker> = local.broker.clone();
            tracing::info!("Publishing to in-process event bus");
            (broker, Some(local))
        }
    };

    // --- App state ---
    let publisher = Arc::new(Publisher::new(broker, &bus));
    let state = AppState {
        config: Arc::new(config.clone()),
        bus: Arc::new(bus),
        publisher,
        started_at,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(local) = local_bus {
        local.shutdown().await;
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
