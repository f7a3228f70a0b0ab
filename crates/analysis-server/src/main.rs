//! Analysis Server
//!
//! Serves the JSON API for game and position analysis. Collaborators that
//! cannot be started (no engine binary, no API key) are reported at startup
//! and the server runs in degraded mode.

use std::path::PathBuf;
use std::sync::Arc;

use analysis_server::api::probe;
use analysis_server::config::{mask_secret, ServerConfig};
use analysis_server::{router, AppState};
use anyhow::Context;
use chess_analysis::{Commentator, EvaluatorHandle};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "analysis-server")]
#[command(about = "Chess game and position analysis relay")]
struct Cli {
    /// Configuration file (default: analysis.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine.
    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_process_env()
        .context("Invalid environment configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing::info!(
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "Starting analysis server"
    );

    tracing::info!(
        path = %config.engine.path,
        depth = config.engine.depth,
        "Connecting to evaluator"
    );
    let evaluator = EvaluatorHandle::connect(config.engine.clone()).await;
    if let EvaluatorHandle::Unavailable { reason } = &evaluator {
        tracing::warn!(reason = %reason, "Evaluator unavailable, positions get fallback evaluations");
    }

    match config.commentary.api_key.as_deref() {
        Some(key) => tracing::info!(
            key = %mask_secret(key),
            model = %config.commentary.model,
            "Commentary API key found"
        ),
        None => tracing::warn!("GROQ_API_KEY not set, commentary disabled"),
    }
    let commentator = Commentator::from_config(&config.commentary);

    if config.probe_on_startup && commentator.is_available() {
        let (status, result) = probe::probe(&commentator).await;
        if status.is_success() {
            tracing::info!(message = %result.message, "Commentary probe succeeded");
        } else {
            tracing::warn!(message = %result.message, "Commentary probe failed");
        }
    }

    let state = AppState {
        evaluator: Arc::new(evaluator),
        commentator: Arc::new(commentator),
        replay: config.replay,
    };
    let app = router(state);

    let addr = config.socket_addr().context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
