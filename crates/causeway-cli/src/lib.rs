//! # causeway-cli
//!
//! Command-line interface for the Causeway operation relay.
//!
//! ## Commands
//!
//! - `causeway submit` - Submit an operation, optionally waiting for the result
//! - `causeway status` - Check the status of an operation once
//! - `causeway watch` - Poll an operation until it settles
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `CAUSEWAY_API_URL` - Relay endpoint (default: `http://localhost:8080`)

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use clap::{Parser, Subcommand};

/// Causeway CLI - operation relay command-line interface.
#[derive(Debug, Parser)]
#[command(name = "causeway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Relay API URL.
    #[arg(long, env = "CAUSEWAY_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            format: self.format.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit an operation.
    Submit(commands::submit::SubmitArgs),
    /// Check the status of an operation once.
    Status(commands::status::StatusArgs),
    /// Poll an operation until it settles.
    Watch(commands::watch::WatchArgs),
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Relay API URL.
    pub api_url: String,
    /// Output format.
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "causeway",
            "--api-url",
            "https://relay.example.com",
            "--format",
            "json",
            "status",
            "conv-1",
        ]);

        let config = cli.config();
        assert_eq!(config.api_url, "https://relay.example.com");
        assert!(matches!(config.format, OutputFormat::Json));
    }
}
