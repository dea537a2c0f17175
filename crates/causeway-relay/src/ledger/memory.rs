//! In-memory ledger implementation.
//!
//! This module provides [`InMemoryLedger`], the default implementation of the
//! [`OperationLedger`] trait: a `RwLock<HashMap>` keyed by correlation id.
//!
//! ## Limitations
//!
//! - **Single-process only**: state is not shared across process boundaries
//! - **No persistence**: all in-flight operations are lost when the process
//!   exits; callers are expected to resubmit

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use causeway_core::CorrelationId;

use super::{CompletionOutcome, LedgerEntry, OperationLedger};
use crate::error::{Error, Result};
use crate::op::{CompletionUpdate, Operation};

/// In-memory operation ledger.
///
/// Thread-safe via a single `RwLock` over the whole map. Compound operations
/// run under one write guard, which gives the per-key atomicity the
/// [`OperationLedger`] contract requires.
///
/// ## Example
///
/// ```rust
/// use causeway_relay::ledger::InMemoryLedger;
///
/// let ledger = InMemoryLedger::new();
/// // Hand to a Relay as Arc<dyn OperationLedger>...
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    operations: RwLock<HashMap<CorrelationId, Operation>>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

impl InMemoryLedger {
    /// Creates a new, empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OperationLedger for InMemoryLedger {
    async fn put(&self, operation: Operation) -> Result<()> {
        {
            let mut operations = self.operations.write().map_err(poison_err)?;
            operations.insert(operation.correlation_id.clone(), operation);
        }
        Ok(())
    }

    async fn get(&self, id: &CorrelationId) -> Result<Option<Operation>> {
        let result = {
            let operations = self.operations.read().map_err(poison_err)?;
            operations.get(id).cloned()
        };
        Ok(result)
    }

    async fn delete(&self, id: &CorrelationId) -> Result<bool> {
        let removed = {
            let mut operations = self.operations.write().map_err(poison_err)?;
            operations.remove(id).is_some()
        };
        Ok(removed)
    }

    async fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize> {
        let removed = {
            let mut operations = self.operations.write().map_err(poison_err)?;
            let before = operations.len();
            operations.retain(|_, op| !op.is_expired(now, ttl));
            before - operations.len()
        };
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        let count = {
            let operations = self.operations.read().map_err(poison_err)?;
            operations.len()
        };
        Ok(count)
    }

    async fn complete(
        &self,
        id: &CorrelationId,
        update: CompletionUpdate,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<CompletionOutcome> {
        let mut operations = self.operations.write().map_err(poison_err)?;

        let Some(operation) = operations.get_mut(id) else {
            drop(operations);
            return Ok(CompletionOutcome::Absent);
        };

        if operation.is_expired(now, ttl) {
            operations.remove(id);
            drop(operations);
            return Ok(CompletionOutcome::Expired);
        }

        operation.apply(update);
        let updated = operation.clone();
        drop(operations);
        Ok(CompletionOutcome::Applied(updated))
    }

    async fn fetch_live(
        &self,
        id: &CorrelationId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<LedgerEntry> {
        let mut operations = self.operations.write().map_err(poison_err)?;

        let Some(operation) = operations.get(id) else {
            drop(operations);
            return Ok(LedgerEntry::Absent);
        };

        if operation.is_expired(now, ttl) {
            operations.remove(id);
            drop(operations);
            return Ok(LedgerEntry::Expired);
        }

        let live = operation.clone();
        drop(operations);
        Ok(LedgerEntry::Live(live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> CorrelationId {
        s.parse().unwrap()
    }

    fn ttl() -> Duration {
        Duration::minutes(5)
    }

    #[tokio::test]
    async fn put_and_get_roundtrip() -> Result<()> {
        let ledger = InMemoryLedger::new();
        assert!(ledger.get(&id("conv-1")).await?.is_none());

        ledger.put(Operation::pending(id("conv-1"))).await?;

        let stored = ledger.get(&id("conv-1")).await?.unwrap();
        assert_eq!(stored.correlation_id, id("conv-1"));
        assert_eq!(ledger.len().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() -> Result<()> {
        let ledger = InMemoryLedger::new();
        let first = Operation::pending_at(id("conv-1"), Utc::now() - Duration::minutes(2));
        ledger.put(first.clone()).await?;

        let second = Operation::pending(id("conv-1"));
        ledger.put(second.clone()).await?;

        let stored = ledger.get(&id("conv-1")).await?.unwrap();
        assert_eq!(stored.created_at, second.created_at);
        assert_ne!(stored.created_at, first.created_at);
        assert_eq!(ledger.len().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn delete_reports_whether_present() -> Result<()> {
        let ledger = InMemoryLedger::new();
        ledger.put(Operation::pending(id("conv-1"))).await?;

        assert!(ledger.delete(&id("conv-1")).await?);
        assert!(!ledger.delete(&id("conv-1")).await?);
        assert!(!ledger.delete(&id("never-seen")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_records() -> Result<()> {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();
        ledger
            .put(Operation::pending_at(id("stale"), now - Duration::minutes(6)))
            .await?;
        ledger
            .put(Operation::pending_at(id("fresh"), now - Duration::minutes(1)))
            .await?;

        let removed = ledger.sweep(now, ttl()).await?;
        assert_eq!(removed, 1);
        assert!(ledger.get(&id("stale")).await?.is_none());
        assert!(ledger.get(&id("fresh")).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn sweep_on_empty_ledger_returns_zero() -> Result<()> {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.sweep(Utc::now(), ttl()).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn complete_applies_and_preserves_created_at() -> Result<()> {
        let ledger = InMemoryLedger::new();
        let pending = Operation::pending(id("conv-2"));
        let created_at = pending.created_at;
        ledger.put(pending).await?;

        let outcome = ledger
            .complete(
                &id("conv-2"),
                CompletionUpdate::Success {
                    result: json!("Hello"),
                },
                Utc::now(),
                ttl(),
            )
            .await?;

        let CompletionOutcome::Applied(updated) = outcome else {
            panic!("expected Applied, got {outcome:?}");
        };
        assert_eq!(updated.status, crate::op::OperationStatus::Completed);
        assert_eq!(updated.result, Some(json!("Hello")));
        assert_eq!(updated.created_at, created_at);
        Ok(())
    }

    #[tokio::test]
    async fn complete_is_last_write_wins() -> Result<()> {
        let ledger = InMemoryLedger::new();
        ledger.put(Operation::pending(id("conv-2"))).await?;

        ledger
            .complete(
                &id("conv-2"),
                CompletionUpdate::Success {
                    result: json!("first"),
                },
                Utc::now(),
                ttl(),
            )
            .await?;
        ledger
            .complete(
                &id("conv-2"),
                CompletionUpdate::Failure {
                    message: "second".to_string(),
                },
                Utc::now(),
                ttl(),
            )
            .await?;

        let stored = ledger.get(&id("conv-2")).await?.unwrap();
        assert_eq!(stored.status, crate::op::OperationStatus::Error);
        assert!(stored.result.is_none());
        assert_eq!(stored.error_message.as_deref(), Some("second"));
        Ok(())
    }

    #[tokio::test]
    async fn complete_on_unknown_id_is_absent() -> Result<()> {
        let ledger = InMemoryLedger::new();
        let outcome = ledger
            .complete(
                &id("never-seen"),
                CompletionUpdate::Failure {
                    message: "late".to_string(),
                },
                Utc::now(),
                ttl(),
            )
            .await?;
        assert_eq!(outcome, CompletionOutcome::Absent);
        Ok(())
    }

    #[tokio::test]
    async fn complete_on_stale_record_deletes_it() -> Result<()> {
        let ledger = InMemoryLedger::new();
        ledger
            .put(Operation::pending_at(
                id("conv-1"),
                Utc::now() - Duration::minutes(6),
            ))
            .await?;

        let outcome = ledger
            .complete(
                &id("conv-1"),
                CompletionUpdate::Success {
                    result: json!("too late"),
                },
                Utc::now(),
                ttl(),
            )
            .await?;

        assert_eq!(outcome, CompletionOutcome::Expired);
        assert!(ledger.get(&id("conv-1")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn fetch_live_reaps_stale_then_reports_absent() -> Result<()> {
        let ledger = InMemoryLedger::new();
        ledger
            .put(Operation::pending_at(
                id("conv-1"),
                Utc::now() - Duration::minutes(6),
            ))
            .await?;

        let first = ledger.fetch_live(&id("conv-1"), Utc::now(), ttl()).await?;
        assert_eq!(first, LedgerEntry::Expired);

        let second = ledger.fetch_live(&id("conv-1"), Utc::now(), ttl()).await?;
        assert_eq!(second, LedgerEntry::Absent);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_live_retains_completed_records() -> Result<()> {
        let ledger = InMemoryLedger::new();
        ledger.put(Operation::pending(id("conv-2"))).await?;
        ledger
            .complete(
                &id("conv-2"),
                CompletionUpdate::Success {
                    result: json!("Hello"),
                },
                Utc::now(),
                ttl(),
            )
            .await?;

        // Repeated reads return the identical payload; no delete-on-read.
        for _ in 0..3 {
            let entry = ledger.fetch_live(&id("conv-2"), Utc::now(), ttl()).await?;
            let LedgerEntry::Live(op) = entry else {
                panic!("expected live record");
            };
            assert_eq!(op.result, Some(json!("Hello")));
        }
        Ok(())
    }
}
