//! Submit command - submit an operation to the relay.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;

use causeway_client::{ClientError, RelayClient};
use causeway_core::CorrelationId;
use serde_json::json;

use crate::{Config, OutputFormat};

/// Arguments for the submit command.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// The message to process.
    #[arg()]
    pub message: String,

    /// Correlation ID to track the operation under (minted when absent).
    #[arg(long, short = 'c')]
    pub correlation_id: Option<String>,

    /// Wait for the operation to settle and print the result.
    #[arg(long, short = 'w')]
    pub wait: bool,

    /// How long to wait before giving up (when using --wait).
    #[arg(long, default_value = "180")]
    pub deadline_secs: u64,
}

/// Execute the submit command.
///
/// # Errors
///
/// Returns an error if the correlation ID is invalid, the submission is
/// rejected, or waiting ends without a successful result.
pub async fn execute(args: SubmitArgs, config: &Config) -> Result<()> {
    let correlation_id = args
        .correlation_id
        .as_deref()
        .map(str::parse::<CorrelationId>)
        .transpose()
        .context("invalid correlation ID")?;

    let client = RelayClient::builder(&config.api_url)
        .poll_deadline(Duration::from_secs(args.deadline_secs))
        .build()?;

    let ticket = client
        .submit(&args.message, correlation_id.as_ref())
        .await?;

    if !args.wait {
        match config.format {
            OutputFormat::Json => {
                let value = json!({
                    "correlationId": ticket.correlation_id,
                    "statusUrl": ticket.status_url,
                    "intervalMs": ticket.interval_ms,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                println!("Submitted: {}", ticket.correlation_id);
                println!("Poll: {}", ticket.status_url);
            }
        }
        return Ok(());
    }

    match client.poll_until_settled(&ticket.correlation_id).await {
        Ok(result) => {
            match config.format {
                OutputFormat::Json => {
                    let value = json!({
                        "correlationId": ticket.correlation_id,
                        "status": "completed",
                        "result": result,
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                OutputFormat::Text => {
                    println!("Operation: {}", ticket.correlation_id);
                    println!("Status: {}", "completed".green());
                    println!("Result: {}", serde_json::to_string_pretty(&result)?);
                }
            }
            Ok(())
        }
        Err(ClientError::OperationFailed { message }) => {
            eprintln!("Operation {} failed: {}", ticket.correlation_id, message.red());
            anyhow::bail!("operation failed: {message}")
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: SubmitArgs,
        }

        let cli = TestCli::parse_from(["test", "Hello", "--correlation-id", "conv-1", "--wait"]);
        assert_eq!(cli.args.message, "Hello");
        assert_eq!(cli.args.correlation_id.as_deref(), Some("conv-1"));
        assert!(cli.args.wait);
        assert_eq!(cli.args.deadline_secs, 180);
    }
}
