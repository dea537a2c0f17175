//! Causeway CLI - Command-line interface for the operation relay.
//!
//! The main entry point for the `causeway` CLI binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use causeway_cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Submit(args) => causeway_cli::commands::submit::execute(args, &config).await,
            Commands::Status(args) => causeway_cli::commands::status::execute(&args, &config).await,
            Commands::Watch(args) => causeway_cli::commands::watch::execute(&args, &config).await,
        }
    })
}
