//! # causeway-api
//!
//! HTTP composition layer for the Causeway operation relay.
//!
//! This crate provides the API surface for Causeway, handling:
//!
//! - **Routing**: submission, status, and callback endpoints
//! - **Service Wiring**: composition of the relay, ledger, and dispatcher
//! - **Observability**: metrics, tracing, and health checks
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! All relay logic lives in `causeway-relay`.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                                      - Health check
//! GET  /ready                                       - Readiness check
//! GET  /metrics                                     - Prometheus metrics
//! GET  /openapi.json                                - OpenAPI spec
//! POST /api/v1/operations                           - Submit an operation
//! GET  /api/v1/operations/{correlationId}           - Poll operation status
//! POST /api/v1/operations/{correlationId}/complete  - Worker completion callback
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use causeway_api::server::Server;
//!
//! let server = Server::builder()
//!     .http_port(8080)
//!     .worker_url("http://worker:9000/work")
//!     .build()?;
//!
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
