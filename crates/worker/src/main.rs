use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_events::BackendOptions;
use courier_worker::{build_consumer, invoke, resolve_channel, WorkerError, EXIT_RETRYABLE};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the invocation response.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_worker=debug,courier_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        // Errors outside the consumer (stdin, stdout) are worth another try.
        let code = e
            .downcast_ref::<WorkerError>()
            .map_or(EXIT_RETRYABLE, WorkerError::exit_code);
        tracing::error!(error = %format!("{e:#}"), exit_code = code, "Invocation failed");
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let arg = std::env::args().nth(1);
    let env_value = std::env::var("CONSUMER_CHANNEL").ok();
    let channel = resolve_channel(arg.as_deref(), env_value.as_deref())?;

    let target = build_consumer(channel, &BackendOptions::from_env())?;
    tracing::info!(%channel, "Consumer ready");

    let mut input = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut input)
        .await
        .context("Failed to read invocation payload from stdin")?;

    let response = invoke(target.as_ref(), &input).await?;

    let mut out = serde_json::to_vec(&response)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(&out)
        .await
        .context("Failed to write invocation response")?;
    stdout.flush().await?;

    Ok(())
}
