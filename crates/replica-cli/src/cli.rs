//! CLI command definitions using clap

use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Replica CLI - feed training content into replica knowledge bases
#[derive(Parser)]
#[command(name = "replica")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json, yaml)
    #[arg(short = 'o', long, global = true, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Configuration file path (yaml, toml or json)
    #[arg(short = 'c', long, global = true, env = "REPLICA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest content into a replica's knowledge base
    Ingest(IngestArgs),

    /// Look up the real id of an entry left pending after creation
    Reconcile {
        /// Replica id
        #[arg(short, long)]
        resource: String,

        /// Title the entry was created with
        #[arg(short, long)]
        title: String,

        /// Provider the entry was created on
        #[arg(short, long, value_enum, default_value_t = ProviderChoice::Primary)]
        provider: ProviderChoice,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct IngestArgs {
    /// Replica id
    #[arg(short, long)]
    pub resource: String,

    /// Text content (repeatable)
    #[arg(long)]
    pub text: Vec<String>,

    /// File to upload (repeatable)
    #[arg(long)]
    pub file: Vec<PathBuf>,

    /// URL to ingest (repeatable)
    #[arg(long)]
    pub url: Vec<String>,

    /// Title for every item instead of the per-kind default
    #[arg(long)]
    pub title: Option<String>,

    /// Print the health snapshot after ingestion
    #[arg(long)]
    pub health: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Load and validate the configuration
    Check,
    /// Print the effective configuration, secrets redacted
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderChoice {
    Primary,
    Secondary,
}
