//! Narration Producer (fablecast-np) - Main entry point
//!
//! HTTP service that turns book text into narrated audio with mood-matched
//! background music and uploads the result to durable storage.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fablecast_np::api;
use fablecast_np::config::NpConfig;
use fablecast_np::pipeline::Orchestrator;
use fablecast_np::services::classifier::ChatClassifier;
use fablecast_np::services::music::MusicCatalog;
use fablecast_np::services::synthesizer::SpeechSynthesizer;
use fablecast_np::storage::HttpArtifactStore;

/// Command-line arguments for fablecast-np
#[derive(Parser, Debug)]
#[command(name = "fablecast-np")]
#[command(about = "Narration producer service for Fablecast")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5760", env = "FABLECAST_NP_PORT")]
    port: u16,

    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long, env = "FABLECAST_NP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fablecast_np=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Fablecast Narration Producer on port {}", args.port);

    let config =
        NpConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!("Worker limit: {}", config.worker_limit);

    // Provider clients behind the orchestrator's trait seams
    let classifier =
        Arc::new(ChatClassifier::new(&config.classifier).context("Failed to build classifier")?);
    let speech = Arc::new(
        SpeechSynthesizer::new(&config.synthesis).context("Failed to build synthesizer")?,
    );
    let music =
        Arc::new(MusicCatalog::new(&config.music).context("Failed to build music catalog")?);
    let store =
        Arc::new(HttpArtifactStore::new(&config.storage).context("Failed to build artifact store")?);

    let orchestrator = Arc::new(Orchestrator::new(
        classifier,
        speech,
        music,
        store,
        config.worker_limit,
    ));

    let app_state = api::AppState {
        orchestrator,
        port: args.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
