use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use correlog::config::{Config, LogFormat};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config; without CORRELOG_CONFIG the built-in defaults apply.
    let config_path = std::env::var("CORRELOG_CONFIG").ok().map(PathBuf::from);
    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    init_tracing(&config);

    info!(
        port = config.server.port,
        header = %config.correlation.header,
        generator = %config.correlation.generator,
        request_log = config.request_log.enabled,
        "correlog demo starting"
    );

    let app = api::router(&config).context("building router")?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over `[server] log_level`, which wins over the default.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            config
                .server
                .log_level
                .as_deref()
                .and_then(|level| EnvFilter::try_new(level).ok())
        })
        .unwrap_or_else(|| "correlog=info,tower_http=warn".into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.server.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().with_current_span(true).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
