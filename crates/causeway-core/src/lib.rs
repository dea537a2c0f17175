//! # causeway-core
//!
//! Shared kernel for the Causeway operation relay.
//!
//! This crate holds the small set of types every other Causeway crate agrees
//! on:
//!
//! - **Correlation identifiers**: the caller-supplied key that ties a
//!   submission, its worker callback, and its status polls together
//! - **Core errors**: the error vocabulary shared across crate boundaries
//! - **Observability**: logging initialization used by every binary
//!
//! ## Design Principles
//!
//! No domain policy lives here. Operation records, the ledger, and dispatch
//! behavior belong to `causeway-relay`; HTTP concerns belong to
//! `causeway-api`.
//!
//! ## Example
//!
//! ```rust
//! use causeway_core::id::CorrelationId;
//!
//! let supplied: CorrelationId = "conv-2".parse().unwrap();
//! let minted = CorrelationId::generate();
//! assert_ne!(supplied, minted);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::CorrelationId;
}

pub use error::{Error, Result};
pub use id::CorrelationId;
pub use observability::{init_logging, LogFormat};
