//! Confidence Server
//!
//! Starts the analysis queue in front of one UCI engine and serves
//! confidence tree builds over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use analysis_queue::{AnalysisQueue, SearchStabilityScorer, UciLauncher};
use anyhow::Context;
use clap::Parser;
use confidence_server::config::ServerConfig;
use confidence_server::{router, AppState};
use confidence_tree::ConfidenceTreeBuilder;

/// Confidence Server - Builds confidence trees with a UCI engine.
#[derive(Parser)]
#[command(name = "confidence-server")]
#[command(about = "Builds confidence trees with a UCI engine")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value_os_t = ServerConfig::config_path())]
    config: PathBuf,

    /// Address to listen on, overriding the config file
    #[arg(long)]
    listen: Option<String>,

    /// Engine executable, overriding the config file
    #[arg(long)]
    engine: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = ServerConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(engine) = args.engine {
        config.engine.path = engine;
    }

    tracing::info!(engine = %config.engine.path, "Starting analysis queue");
    let queue = AnalysisQueue::start(
        UciLauncher::new(config.engine.clone()),
        Arc::new(SearchStabilityScorer::default()),
        config.queue.clone(),
    );
    let state = AppState {
        builder: ConfidenceTreeBuilder::new(queue, config.build.tree.clone()),
        defaults: config.build.defaults,
    };

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen))?;
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
