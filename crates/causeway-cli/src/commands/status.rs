//! Status command - check operation status once.

use anyhow::Result;
use clap::Args;

use causeway_client::RelayClient;

use crate::Config;
use crate::commands::print_status;

/// Arguments for the status command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Correlation ID to check.
    #[arg()]
    pub correlation_id: String,
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if the relay cannot be reached.
pub async fn execute(args: &StatusArgs, config: &Config) -> Result<()> {
    let client = RelayClient::new(&config.api_url)?;
    let status = client.fetch_status(&args.correlation_id).await?;
    print_status(&args.correlation_id, &status, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: StatusArgs,
        }

        let cli = TestCli::parse_from(["test", "conv-1"]);
        assert_eq!(cli.args.correlation_id, "conv-1");
    }
}
