//! Polling client for the Causeway operation relay.
//!
//! Submits operations to a relay, then polls the status endpoint on an
//! adaptive schedule until the operation settles or a deadline elapses.
//!
//! ```no_run
//! use causeway_client::{ClientError, RelayClient};
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = RelayClient::new("http://localhost:8080")?;
//! let result = client.submit_and_wait("Hello", None).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod schedule;

/// Commonly used client types.
pub mod prelude {
    pub use crate::client::{PollStatus, RelayClient, RelayClientBuilder, SubmissionTicket};
    pub use crate::error::{ClientError, Result};
    pub use crate::schedule::PollSchedule;
}

pub use client::{PollStatus, RelayClient, RelayClientBuilder, SubmissionTicket};
pub use error::{ClientError, Result};
pub use schedule::PollSchedule;
