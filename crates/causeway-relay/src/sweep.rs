//! Background reaper for abandoned operations.
//!
//! Lazy expiry on the read path only reaps records somebody asks about. The
//! sweeper covers the rest: operations whose submitter went away and never
//! polled again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ledger::OperationLedger;
use crate::metrics as relay_metrics;

/// Periodically removes expired records from a ledger.
pub struct Sweeper {
    ledger: Arc<dyn OperationLedger>,
    ttl: chrono::Duration,
    tick: Duration,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("ttl", &self.ttl)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Sweeper {
    /// Creates a sweeper ticking at half the time-to-live, so a record
    /// overstays by at most 50% before the periodic reap catches it.
    #[must_use]
    pub fn new(ledger: Arc<dyn OperationLedger>, ttl: chrono::Duration) -> Self {
        let tick = (ttl / 2)
            .to_std()
            .unwrap_or_else(|_| Duration::from_secs(150));
        Self { ledger, ttl, tick }
    }

    /// Overrides the tick interval.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Spawns the sweep loop. Abort the returned handle to stop it.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        info!(tick_secs = self.tick.as_secs(), "starting operation sweeper");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick);
            // The first tick fires immediately; skip it so a fresh process
            // does not sweep an empty ledger.
            interval.tick().await;

            loop {
                interval.tick().await;
                match self.ledger.sweep(Utc::now(), self.ttl).await {
                    Ok(0) => debug!("sweep found nothing to reap"),
                    Ok(removed) => {
                        relay_metrics::record_expirations(removed);
                        info!(removed, "swept expired operations");
                    }
                    Err(e) => warn!(error = %e, "sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::op::Operation;
    use causeway_core::CorrelationId;

    #[tokio::test]
    async fn sweeper_reaps_backdated_records() {
        let ledger: Arc<dyn OperationLedger> = Arc::new(InMemoryLedger::new());
        let id: CorrelationId = "stale".parse().unwrap();
        ledger
            .put(Operation::pending_at(
                id.clone(),
                Utc::now() - chrono::Duration::minutes(6),
            ))
            .await
            .unwrap();

        let handle = Sweeper::new(Arc::clone(&ledger), chrono::Duration::minutes(5))
            .with_tick(Duration::from_millis(10))
            .spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(ledger.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweeper_leaves_fresh_records_alone() {
        let ledger: Arc<dyn OperationLedger> = Arc::new(InMemoryLedger::new());
        let id: CorrelationId = "fresh".parse().unwrap();
        ledger.put(Operation::pending(id.clone())).await.unwrap();

        let handle = Sweeper::new(Arc::clone(&ledger), chrono::Duration::minutes(5))
            .with_tick(Duration::from_millis(10))
            .spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(ledger.get(&id).await.unwrap().is_some());
    }
}
