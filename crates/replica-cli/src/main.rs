//! Replica CLI - ingest training content into replica knowledge bases

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))?;
    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest(args) => {
            commands::ingest::run(args, &config, cli.output).await?;
        }

        Commands::Reconcile {
            resource,
            title,
            provider,
        } => {
            commands::reconcile::run(&resource, &title, provider, &config, cli.output).await?;
        }

        Commands::Config { action } => match action {
            ConfigCommands::Check => commands::config_cmd::run_check(&config),
            ConfigCommands::Show => commands::config_cmd::run_show(&config, cli.output)?,
        },
    }

    Ok(())
}
