//! Pluggable storage for operation records.
//!
//! The [`OperationLedger`] trait defines the single point of truth for the
//! relay. Every submission, completion callback, status read, and sweep goes
//! through it.
//!
//! ## Design Principles
//!
//! - **Per-key atomicity**: the compound operations ([`OperationLedger::complete`]
//!   and [`OperationLedger::fetch_live`]) perform their check-expiry-then-act
//!   sequence under one lock acquisition, so a record is only ever observed
//!   live or absent
//! - **Explicit clocks**: `sweep`, `complete`, and `fetch_live` take `now` as
//!   an argument, so expiry is testable without sleeping
//! - **Testability**: the in-memory implementation is the production default
//!   for this single-process design; the trait seam permits external stores

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use causeway_core::CorrelationId;

use crate::error::Result;
use crate::op::{CompletionUpdate, Operation};

pub use memory::InMemoryLedger;

/// Result of an atomic live-record lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    /// The record exists and is within its time-to-live.
    Live(Operation),
    /// The record existed but aged out; it has been deleted.
    Expired,
    /// No record under this id.
    Absent,
}

impl LedgerEntry {
    /// Returns true if a live record was found.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

/// Result of an atomic completion write.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The update was applied; the updated record is returned.
    Applied(Operation),
    /// The record existed but aged out; it has been deleted instead.
    Expired,
    /// No record under this id.
    Absent,
}

/// Storage abstraction for operation records.
///
/// All methods are safe under concurrent access from submission, completion,
/// status-read, and sweep paths. Every operation touches exactly one key, so
/// implementations need per-key serialization but no multi-key transactions;
/// a single lock over the whole map satisfies the contract.
#[async_trait]
pub trait OperationLedger: Send + Sync {
    /// Inserts or overwrites a record. Always succeeds.
    async fn put(&self, operation: Operation) -> Result<()>;

    /// Returns the record under `id`, if present. Does not consider expiry.
    async fn get(&self, id: &CorrelationId) -> Result<Option<Operation>>;

    /// Removes the record under `id`; returns whether anything was removed.
    async fn delete(&self, id: &CorrelationId) -> Result<bool>;

    /// Removes every record older than `ttl` as of `now`; returns the count.
    async fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize>;

    /// Current record count (diagnostic).
    async fn len(&self) -> Result<usize>;

    /// Atomically applies a terminal outcome to the record under `id`.
    ///
    /// - absent → [`CompletionOutcome::Absent`]
    /// - present but past `ttl` → deleted, [`CompletionOutcome::Expired`]
    /// - otherwise the update is applied preserving `created_at` and the
    ///   updated record is returned
    async fn complete(
        &self,
        id: &CorrelationId,
        update: CompletionUpdate,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<CompletionOutcome>;

    /// Atomically fetches the record under `id`, enforcing lazy expiry.
    ///
    /// - absent → [`LedgerEntry::Absent`]
    /// - present but past `ttl` → deleted, [`LedgerEntry::Expired`]
    /// - otherwise a copy of the live record is returned
    async fn fetch_live(
        &self,
        id: &CorrelationId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<LedgerEntry>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_entry_is_live() {
        let op = Operation::pending("conv-1".parse().unwrap());
        assert!(LedgerEntry::Live(op).is_live());
        assert!(!LedgerEntry::Expired.is_live());
        assert!(!LedgerEntry::Absent.is_live());
    }
}
