use std::net::SocketAddr;

use slacker::{app, build_state, AppConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise structured logging. Reads RUST_LOG environment variable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // A bad configuration is fatal: bail out before binding anything.
    let config = AppConfig::from_env()?;
    tracing::info!(config = ?config, "loaded configuration");

    let state = build_state(&config)?;
    tracing::info!(
        commands = ?state.dispatcher.registry().names(),
        "registered commands"
    );
    let app = app(state);

    let listener = TcpListener::bind(config.listen_address.as_str()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
