//! # quizcast
//!
//! Server binary: loads settings, wires the bus, content producer, and
//! fanout server together, and serves until ctrl-c.

#![deny(unsafe_code)]

mod backend;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use quizcast_content::FallbackGenerator;
use quizcast_core::logging::{LogFormat, init_subscriber};
use quizcast_server::{QuizcastServer, ServerConfig};
use quizcast_settings::QuizcastSettings;

/// quizcast real-time quiz server.
#[derive(Parser, Debug)]
#[command(name = "quizcast", about = "Room-scoped real-time quiz event server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings, 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.quizcast/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Apply CLI overrides on top of loaded settings.
    fn apply(&self, settings: &mut QuizcastSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(quizcast_settings::settings_path);
    let mut settings = quizcast_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_subscriber(&settings.logging.level, format);

    let metrics_handle = quizcast_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let bus = backend::build_bus(&settings.bus)?;
    let content = Arc::new(FallbackGenerator::from_settings(&settings.content));

    let server = Arc::new(
        QuizcastServer::new(ServerConfig::from_settings(&settings), bus, content)
            .with_metrics(metrics_handle),
    );
    let _ = server.start_listener();

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        version = quizcast_core::constants::VERSION,
        backend = ?settings.bus.backend,
        "quizcast listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.stop(vec![handle]).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
