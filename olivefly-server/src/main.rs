// OliveFly detection service

use clap::Parser;
use olivefly_core::ServiceConfig;
use olivefly_server::{build_state, create_router, init_tracing};
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "olivefly-server")]
#[command(about = "OliveFly trap image detection service", long_about = None)]
struct Args {
    /// TOML configuration file, layered under the environment
    #[arg(short, long, env = "OLIVEFLY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::load(args.config.as_deref())?;

    init_tracing(&config);
    info!("Starting OliveFly detection service...");

    let addr = config.bind_addr();
    let state = build_state(config)?;

    // warm the model so the first request does not pay for the load
    let models = state.models.clone();
    tokio::task::spawn_blocking(move || {
        if models.get().is_none() {
            warn!("Model not loaded at startup, will retry on first request");
        }
    });

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
