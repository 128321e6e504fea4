//! MergeFlow command-line tool.
//!
//! Merges the current (or a named) branch into the primary branch or a test
//! branch, mirroring the tools the MCP server exposes, with an extra
//! `--push` flag to update the remote after a successful merge.

mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mergeflow_core::config::AppConfig;
use mergeflow_core::models::{MergeOutcome, MergeRequest};
use mergeflow_core::workflow::MergeEngine;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// MergeFlow command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergeflow",
    version,
    about = "Merge the current branch into the primary or a test branch"
)]
struct Cli {
    /// Path to the TOML configuration file. Falls back to the user config
    /// directory, then to built-in defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository path (overrides the config file).
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge into the primary branch (main/master).
    Main {
        /// Source branch; the currently checked-out branch when omitted.
        #[arg(long)]
        source: Option<String>,

        /// Merge commit message.
        #[arg(short, long)]
        message: Option<String>,

        /// Condense the source branch's history into a single change.
        #[arg(long)]
        squash: bool,

        /// Push the primary branch to the remote after merging.
        #[arg(long)]
        push: bool,
    },

    /// Merge into a test branch, creating it from the primary branch if
    /// missing.
    Test {
        /// Source branch; the currently checked-out branch when omitted.
        #[arg(long)]
        source: Option<String>,

        /// Target test branch (config default when omitted).
        #[arg(long)]
        target: Option<String>,

        /// Merge commit message.
        #[arg(short, long)]
        message: Option<String>,

        /// Condense the source branch's history into a single change.
        #[arg(long)]
        squash: bool,

        /// Push the test branch to the remote after merging.
        #[arg(long)]
        push: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./mergeflow.toml")]
        output: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // Minimal logging for CLI use; RUST_LOG raises it when debugging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Init { output } = &cli.command {
        return cmd_init(output);
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(repo) = cli.repo {
        config.repository.path = repo;
    }
    config.validate().context("invalid configuration")?;

    let engine = MergeEngine::from_config(&config);

    let outcome = match cli.command {
        Commands::Main {
            source,
            message,
            squash,
            push,
        } => {
            let req = MergeRequest {
                source_branch: source,
                commit_message: message,
                squash,
                push,
            };
            engine.merge_to_primary(&req).await
        }
        Commands::Test {
            source,
            target,
            message,
            squash,
            push,
        } => {
            let req = MergeRequest {
                source_branch: source,
                commit_message: message,
                squash,
                push,
            };
            let test_branch =
                target.unwrap_or_else(|| config.merge.default_test_branch.clone());
            engine.merge_to_test(&req, &test_branch).await
        }
        Commands::Init { .. } => unreachable!(),
    };

    Ok(report(&outcome))
}

/// Print the outcome and pick the process exit code. Only a hard failure
/// exits non-zero; no-op and dirty-tree are reported outcomes, not errors.
fn report(outcome: &MergeOutcome) -> ExitCode {
    match outcome {
        MergeOutcome::Completed { .. } => {
            println!("{}", style::success(&outcome.render()));
            ExitCode::SUCCESS
        }
        MergeOutcome::NoOpAlreadyMerged { .. } | MergeOutcome::AbortedDirtyTree => {
            println!("{}", style::warn(&outcome.render()));
            ExitCode::SUCCESS
        }
        MergeOutcome::Failed { .. } => {
            eprintln!("{}", style::error(&outcome.render()));
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Explicit path, else the user config file when present, else defaults.
fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    if let Some(p) = path {
        return AppConfig::load_from_file(p).context("failed to load configuration file");
    }
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return AppConfig::load_from_file(&user_config)
                .context("failed to load user configuration file");
        }
    }
    Ok(AppConfig::default())
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mergeflow").join("config.toml"))
}

fn cmd_init(output: &PathBuf) -> Result<ExitCode> {
    if output.exists() {
        anyhow::bail!("{} already exists, not overwriting", output.display());
    }
    std::fs::write(output, AppConfig::default_toml())
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{}",
        style::success(&format!("wrote default config to {}", output.display()))
    );
    println!("{}", style::dim("edit it and pass --config, or move it to your user config directory"));
    Ok(ExitCode::SUCCESS)
}
