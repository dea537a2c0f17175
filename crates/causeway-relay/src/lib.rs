//! # causeway-relay
//!
//! Domain layer for the Causeway operation relay.
//!
//! This crate holds the state that makes Causeway useful: a concurrency-safe
//! ledger of in-flight operations keyed by correlation id, the dispatch path
//! that hands work to an external worker without blocking the submitter, and
//! the status logic that polling clients read.
//!
//! ## Components
//!
//! - [`op`]: the operation record and its `pending → completed | error`
//!   state machine
//! - [`ledger`]: the [`ledger::OperationLedger`] trait and the in-memory
//!   implementation
//! - [`dispatch`]: the [`dispatch::WorkerDispatcher`] trait and the HTTP
//!   dispatcher with accept and inline modes
//! - [`service`]: the [`service::Relay`] tying submission, completion, and
//!   status together
//! - [`sweep`]: the background reaper for abandoned operations
//!
//! ## Design Principles
//!
//! - **One source of truth**: all shared mutable state lives in the ledger;
//!   submitters, workers, and pollers only ever interact through it
//! - **Lazy expiry**: records past their time-to-live are deleted on read and
//!   by periodic sweeps, never eagerly on the write path
//! - **No hung pollers**: every failure on the dispatch path is converted
//!   into a stored terminal record, so a status query always resolves

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod op;
pub mod service;
pub mod sweep;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dispatch::{DispatchOutcome, WorkerDispatcher};
    pub use crate::error::{Error, Result};
    pub use crate::ledger::{InMemoryLedger, OperationLedger};
    pub use crate::op::{CompletionUpdate, Operation, OperationStatus};
    pub use crate::service::{Relay, RelayConfig, StatusReport};
}

pub use error::{Error, Result};
pub use op::{CompletionUpdate, Operation, OperationStatus};
pub use service::{Relay, RelayConfig, StatusReport, SubmitReceipt};
