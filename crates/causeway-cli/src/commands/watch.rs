//! Watch command - poll an operation until it settles.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use causeway_client::{ClientError, PollStatus, RelayClient};

use crate::Config;
use crate::commands::print_status;

/// Arguments for the watch command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Correlation ID to watch.
    #[arg()]
    pub correlation_id: String,

    /// How long to wait before giving up.
    #[arg(long, default_value = "180")]
    pub deadline_secs: u64,
}

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the relay cannot be reached or the wait ends
/// without a successful result.
pub async fn execute(args: &WatchArgs, config: &Config) -> Result<()> {
    let client = RelayClient::builder(&config.api_url)
        .poll_deadline(Duration::from_secs(args.deadline_secs))
        .build()?;

    match client.poll_until_settled(&args.correlation_id).await {
        Ok(result) => print_status(
            &args.correlation_id,
            &PollStatus::Completed { result },
            config,
        ),
        Err(ClientError::OperationFailed { message }) => {
            print_status(
                &args.correlation_id,
                &PollStatus::Failed {
                    message: message.clone(),
                },
                config,
            )?;
            anyhow::bail!("operation failed: {message}")
        }
        Err(ClientError::NotFound { .. }) => {
            print_status(&args.correlation_id, &PollStatus::NotFound, config)?;
            anyhow::bail!("operation not found")
        }
        Err(ClientError::Expired { .. }) => {
            print_status(&args.correlation_id, &PollStatus::Expired, config)?;
            anyhow::bail!("operation expired")
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: WatchArgs,
        }

        let cli = TestCli::parse_from(["test", "conv-1", "--deadline-secs", "30"]);
        assert_eq!(cli.args.correlation_id, "conv-1");
        assert_eq!(cli.args.deadline_secs, 30);
    }
}
