//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tollgate::{Task, TierPreference};

/// Tollgate - quota-aware access to rate-limited Gemini models
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "Quota-aware, cached, retrying access to rate-limited Gemini models", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file layered over the bundled defaults
    #[arg(short, long, global = true, env = "TOLLGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show availability of both tiers and token counters
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show live countdowns until interrupted
    Watch,

    /// Send a prompt through the invocation layer
    Ask {
        /// Tier to use: auto, primary or secondary
        #[arg(long, default_value = "auto")]
        tier: TierPreference,

        /// Logical task the prompt belongs to
        #[arg(long, default_value = "knowledge-question")]
        task: Task,

        /// Attempt budget override
        #[arg(long)]
        retries: Option<u32>,

        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,

        /// Prompt text
        prompt: String,
    },

    /// Verify connectivity with a minimal request
    Probe,
}
