//! CLI command implementations.

pub mod status;
pub mod submit;
pub mod watch;

use owo_colors::OwoColorize;

use causeway_client::PollStatus;
use serde_json::json;

use crate::{Config, OutputFormat};

/// Print one observed status in the configured format.
pub(crate) fn print_status(
    correlation_id: &str,
    status: &PollStatus,
    config: &Config,
) -> anyhow::Result<()> {
    match config.format {
        OutputFormat::Json => {
            let value = match status {
                PollStatus::Pending { elapsed_ms } => {
                    json!({"correlationId": correlation_id, "status": "pending", "elapsedMs": elapsed_ms})
                }
                PollStatus::Completed { result } => {
                    json!({"correlationId": correlation_id, "status": "completed", "result": result})
                }
                PollStatus::Failed { message } => {
                    json!({"correlationId": correlation_id, "status": "error", "error": message})
                }
                PollStatus::NotFound => {
                    json!({"correlationId": correlation_id, "status": "not_found"})
                }
                PollStatus::Expired => {
                    json!({"correlationId": correlation_id, "status": "expired"})
                }
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Operation: {correlation_id}");
            match status {
                PollStatus::Pending { elapsed_ms } => {
                    println!("Status: {} ({elapsed_ms}ms elapsed)", "pending".yellow());
                }
                PollStatus::Completed { result } => {
                    println!("Status: {}", "completed".green());
                    println!("Result: {}", serde_json::to_string_pretty(result)?);
                }
                PollStatus::Failed { message } => {
                    println!("Status: {}", "error".red());
                    println!("Error: {}", message.red());
                }
                PollStatus::NotFound => println!("Status: {}", "not found".dimmed()),
                PollStatus::Expired => println!("Status: {}", "expired".dimmed()),
            }
        }
    }
    Ok(())
}
