//! Terminal front end for the cinder agent
//!
//! Thin command surface over `cinder-core`: every subcommand builds an
//! orchestrator for the target workspace, runs one operation, prints, and
//! exits. API keys come from `OPENROUTER_API_KEY` (comma-separated for
//! rotation).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cinder_core::ai::OpenRouterProvider;
use cinder_core::{AgentConfig, AgentOrchestrator, CurrentFile};

#[derive(Parser)]
#[command(name = "cinder", version, about = "AI coding agent over an indexed workspace")]
struct Cli {
    /// Workspace root. Defaults to the current directory.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Model identifier to request from the provider.
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the workspace and print a summary.
    Index,
    /// Semantic search over indexed code chunks.
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Print index statistics as JSON.
    Stats,
    /// Run one agent request end to end.
    Run {
        request: String,
        /// Workspace-relative path of the file considered open.
        #[arg(long)]
        current_file: Option<String>,
    },
    /// List undoable steps, or revert one by index (0 is most recent).
    Undo {
        #[arg(long)]
        index: Option<usize>,
    },
    /// Show or clear session state.
    Session {
        #[arg(long)]
        clear: bool,
    },
    /// Remove expired backup snapshots.
    CleanupBackups,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let mut config = AgentConfig::new(&workspace);
    if let Some(model) = cli.model {
        config.model = model;
    }
    config.api_keys = api_keys_from_env();

    let needs_keys = matches!(cli.command, Command::Run { .. });
    if needs_keys && config.api_keys.is_empty() {
        bail!("no API keys: set OPENROUTER_API_KEY (comma-separated for rotation)");
    }

    let provider = Arc::new(OpenRouterProvider::new(config.api_keys.clone()));
    let agent = AgentOrchestrator::new(config, provider);

    match cli.command {
        Command::Index => {
            let report = agent.index_workspace().await;
            println!(
                "indexed {} files ({} unchanged, {} failed) in {}ms",
                report.files_indexed,
                report.files_unchanged,
                report.files_failed,
                report.duration_ms
            );
        }
        Command::Search { query, limit } => {
            agent.index_workspace().await;
            let hits = agent.search(&query, limit).await;
            if hits.is_empty() {
                println!("no matches");
            }
            for hit in hits {
                println!(
                    "{:.3}  {} (lines {}-{})",
                    hit.score, hit.chunk.file_path, hit.chunk.start_line, hit.chunk.end_line
                );
            }
        }
        Command::Stats => {
            agent.index_workspace().await;
            let stats = agent.index_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Run {
            request,
            current_file,
        } => {
            agent.index_workspace().await;
            let current = current_file.map(|path| CurrentFile {
                path,
                content: None,
            });
            let outcome = agent.process(&request, current).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Command::Undo { index } => match index {
            Some(index) => {
                let path = agent
                    .undo(index)
                    .await
                    .with_context(|| format!("undo step {index} failed"))?;
                println!("reverted {path}");
            }
            None => {
                let details = agent.undo_details().await;
                if details.is_empty() {
                    println!("nothing to undo");
                }
                for detail in details {
                    println!(
                        "[{}] {} {} ({})",
                        detail.index, detail.action_kind, detail.path, detail.description
                    );
                }
            }
        },
        Command::Session { clear } => {
            if clear {
                agent.clear_session().await;
                println!("session cleared");
            } else {
                let stats = agent.session_stats().await;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
        Command::CleanupBackups => {
            let removed = agent.cleanup_backups().await;
            println!("removed {removed} expired backups");
        }
    }

    Ok(())
}

fn api_keys_from_env() -> Vec<String> {
    std::env::var("OPENROUTER_API_KEY")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
