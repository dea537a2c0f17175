//! `causeway-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use anyhow::Result;

use causeway_api::config::Config;
use causeway_api::server::Server;
use causeway_core::observability::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    if !config.debug && config.worker_url.is_none() {
        anyhow::bail!("CAUSEWAY_WORKER_URL is required when CAUSEWAY_DEBUG=false");
    }

    init_logging(config.log_format());

    let server = Server::new(config)?;
    server.serve().await?;
    Ok(())
}
