use std::path::PathBuf;

use chorus_config::ReasoningEffort;
use clap::{Parser, Subcommand};

/// Chorus chat client
#[derive(Debug, Parser)]
#[command(name = "chorus", about = "Ask one or several AI models the same question")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "chorus.toml", env = "CHORUS_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a prompt to one or more configured targets
    Ask(AskArgs),
    /// List configured targets
    Targets,
}

#[derive(Debug, clap::Args)]
pub struct AskArgs {
    /// Target label from the config file; repeat for a multi-target run
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Override the configured reasoning effort (off, low, medium, high, extra_high)
    #[arg(short, long)]
    pub effort: Option<ReasoningEffort>,

    /// Wait for the full answer instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Prompt text
    pub prompt: String,
}
