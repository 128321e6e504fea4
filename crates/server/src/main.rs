//! MergeFlow MCP server entry point.
//!
//! Loads configuration, initializes logging (stderr or a file; stdout is
//! owned by the protocol), and serves the merge tools over stdio.

mod protocol;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mergeflow_core::config::AppConfig;
use mergeflow_core::workflow::MergeEngine;

use crate::server::McpServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// MergeFlow MCP server.
#[derive(Parser, Debug)]
#[command(
    name = "mergeflow-server",
    version,
    about = "Expose git branch-merge tools over the Model Context Protocol"
)]
struct Args {
    /// Path to the TOML configuration file (defaults apply when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the repository path from the config file.
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        AppConfig::load_or_default(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(repo) = args.repo {
        config.repository.path = repo;
    }
    config.validate().context("configuration validation failed")?;

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);
    let _log_guard = init_tracing(&config, log_level)?;

    info!("========================================");
    info!("  MergeFlow MCP Server v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Repository    : {}", config.repository.path.display());
    info!("Remote        : {}", config.repository.remote);
    info!("Test branch   : {}", config.merge.default_test_branch);
    info!("Log level     : {}", log_level);
    info!("========================================");

    let engine = MergeEngine::from_config(&config);
    let server = McpServer::new(engine, config);
    server.run().await
}

/// Initialize tracing. Protocol frames own stdout, so diagnostics go to
/// stderr, or to the configured log file via a non-blocking appender whose
/// guard must live for the whole process.
fn init_tracing(
    config: &AppConfig,
    log_level: &str,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.server.log_file {
        Some(path) => {
            let directory = match path.parent() {
                Some(d) if !d.as_os_str().is_empty() => d,
                _ => std::path::Path::new("."),
            };
            let file_name = path
                .file_name()
                .context("server.log_file must name a file")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}
