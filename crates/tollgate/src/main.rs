//! Tollgate CLI binary.
//!
//! This binary provides command-line access to the invocation layer:
//! - Inspect quota availability and token counters
//! - Watch live countdowns
//! - Send prompts and probe connectivity

use clap::Parser;
use tollgate::{TollgateConfig, Tollgate, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use cli::{Cli, Commands, ask, probe, show_status, watch};

    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "warn" };
    init_tracing(log_level, false).map_err(|e| anyhow::anyhow!("{}", e))?;

    let config = match &cli.config {
        Some(path) => TollgateConfig::from_file(path)?,
        None => TollgateConfig::load()?,
    };
    let tollgate = Tollgate::open(config).await?;

    // Execute the requested command
    match cli.command {
        Commands::Status { json } => show_status(&tollgate, json).await?,
        Commands::Watch => watch(&tollgate).await?,
        Commands::Ask {
            tier,
            task,
            retries,
            no_cache,
            prompt,
        } => ask(&tollgate, task, tier, retries, !no_cache, prompt).await?,
        Commands::Probe => probe(&tollgate).await?,
    }

    Ok(())
}
