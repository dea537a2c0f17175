//! The relay service: submission, completion, and status in one place.
//!
//! [`Relay`] owns the ledger and dispatcher and implements the protocol the
//! HTTP layer exposes. Submissions return immediately with a receipt while a
//! spawned task delivers the work; completions arrive out of band from the
//! worker; status reads enforce lazy expiry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, error, info, warn};

use causeway_core::CorrelationId;
use causeway_core::observability::relay_span;

use crate::dispatch::{DispatchOutcome, WorkerDispatchRequest, WorkerDispatcher};
use crate::error::{Error, Result};
use crate::ledger::{CompletionOutcome, LedgerEntry, OperationLedger};
use crate::metrics as relay_metrics;
use crate::op::{CompletionUpdate, Operation};

/// Tunables for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long an operation record stays addressable after creation.
    pub ttl: chrono::Duration,
    /// Maximum delivery attempts per operation, including the first.
    pub dispatch_max_attempts: u32,
    /// Base delay for exponential dispatch backoff.
    pub dispatch_backoff: std::time::Duration,
    /// Base URL clients and the worker use to reach this relay, no trailing
    /// slash. Status and callback URLs are derived from it.
    pub public_base_url: String,
    /// Poll interval suggested to clients in submission receipts.
    pub poll_hint_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::minutes(5),
            dispatch_max_attempts: 3,
            dispatch_backoff: std::time::Duration::from_secs(1),
            public_base_url: "http://localhost:8080".to_string(),
            poll_hint_interval_ms: 1000,
        }
    }
}

/// Receipt returned to the submitter before any work has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Correlation id under which the operation is tracked.
    pub correlation_id: CorrelationId,
    /// URL to poll for the outcome.
    pub status_url: String,
    /// Suggested initial poll interval.
    pub poll_interval_ms: u64,
}

/// Resolution of a status read.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    /// Still in flight.
    Pending {
        /// Milliseconds since submission.
        elapsed_ms: u64,
    },
    /// The worker produced a result; the record stays readable until expiry.
    Completed {
        /// The result payload.
        result: serde_json::Value,
    },
    /// The operation failed terminally.
    Failed {
        /// The stored failure message.
        error: String,
    },
    /// No record under this id.
    NotFound,
    /// The record aged out and has been deleted.
    Expired,
}

/// Core relay service.
pub struct Relay {
    ledger: Arc<dyn OperationLedger>,
    dispatcher: Arc<dyn WorkerDispatcher>,
    config: RelayConfig,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Relay {
    /// Creates a relay over the given ledger and dispatcher.
    pub fn new(
        ledger: Arc<dyn OperationLedger>,
        dispatcher: Arc<dyn WorkerDispatcher>,
        config: RelayConfig,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            config,
        }
    }

    /// The relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The ledger this relay stores records in.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn OperationLedger> {
        &self.ledger
    }

    /// URL a client polls for the given operation.
    #[must_use]
    pub fn status_url(&self, id: &CorrelationId) -> String {
        format!(
            "{}/api/v1/operations/{id}",
            self.config.public_base_url.trim_end_matches('/')
        )
    }

    /// URL the worker posts its terminal outcome to.
    #[must_use]
    pub fn callback_url(&self, id: &CorrelationId) -> String {
        format!("{}/complete", self.status_url(id))
    }

    /// Accepts a submission, stores a pending record, and spawns delivery.
    ///
    /// Returns as soon as the record is stored; delivery runs in the
    /// background. A resubmission under an existing id overwrites the stored
    /// record with a fresh pending one.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `message` is empty after trimming, or
    /// a storage error if the ledger write fails.
    pub async fn submit(self: &Arc<Self>, id: CorrelationId, message: &str) -> Result<SubmitReceipt> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::validation("message must not be empty"));
        }

        // Opportunistic reap keeps the map bounded even if the background
        // sweeper is not running.
        let swept = self.ledger.sweep(Utc::now(), self.config.ttl).await?;
        if swept > 0 {
            relay_metrics::record_expirations(swept);
        }

        let operation = Operation::pending(id.clone());
        let submitted_at = operation.created_at;
        self.ledger.put(operation).await?;
        relay_metrics::record_submission();

        let request = WorkerDispatchRequest {
            correlation_id: id.to_string(),
            message: message.to_string(),
            callback_url: self.callback_url(&id),
            submitted_at,
        };

        let relay = Arc::clone(self);
        let task_id = id.clone();
        let span = relay_span("dispatch", id.as_str());
        tokio::spawn(
            async move {
                relay.dispatch_with_retry(task_id, request).await;
            }
            .instrument(span),
        );

        info!(correlation_id = %id, "submission accepted");
        Ok(SubmitReceipt {
            status_url: self.status_url(&id),
            poll_interval_ms: self.config.poll_hint_interval_ms,
            correlation_id: id,
        })
    }

    /// Delivers one operation to the worker, retrying retryable failures.
    ///
    /// Never returns an error: every failure path ends with a terminal error
    /// record in the ledger so pollers are not left hanging.
    async fn dispatch_with_retry(&self, id: CorrelationId, request: WorkerDispatchRequest) {
        let max_attempts = self.config.dispatch_max_attempts.max(1);
        let mut attempt: u32 = 0;

        let failure = loop {
            attempt += 1;
            relay_metrics::record_dispatch_attempt();

            match self.dispatcher.dispatch(&request).await {
                DispatchOutcome::Accepted => {
                    info!(correlation_id = %id, attempt, "dispatch accepted by worker");
                    return;
                }
                DispatchOutcome::Resolved(update) => {
                    info!(
                        correlation_id = %id,
                        attempt,
                        status = %update.status(),
                        "dispatch resolved inline"
                    );
                    self.store_dispatch_outcome(&id, update).await;
                    return;
                }
                DispatchOutcome::Failed { message, retryable } => {
                    relay_metrics::record_dispatch_failure();
                    if retryable && attempt < max_attempts {
                        let backoff = self
                            .config
                            .dispatch_backoff
                            .saturating_mul(2_u32.saturating_pow(attempt - 1));
                        warn!(
                            correlation_id = %id,
                            attempt,
                            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                            %message,
                            "dispatch failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break message;
                }
            }
        };

        error!(
            correlation_id = %id,
            attempts = attempt,
            %failure,
            "dispatch exhausted, recording error"
        );
        self.store_dispatch_outcome(
            &id,
            CompletionUpdate::Failure {
                message: format!("dispatch to worker failed: {failure}"),
            },
        )
        .await;
    }

    /// Writes a dispatch-produced terminal outcome, logging instead of
    /// propagating errors since this runs on a detached task.
    async fn store_dispatch_outcome(&self, id: &CorrelationId, update: CompletionUpdate) {
        match self
            .ledger
            .complete(id, update, Utc::now(), self.config.ttl)
            .await
        {
            Ok(CompletionOutcome::Applied(op)) => {
                relay_metrics::record_completion(op.status);
            }
            Ok(CompletionOutcome::Expired) => {
                relay_metrics::record_expirations(1);
                warn!(correlation_id = %id, "operation expired before dispatch settled");
            }
            Ok(CompletionOutcome::Absent) => {
                warn!(correlation_id = %id, "operation vanished before dispatch settled");
            }
            Err(e) => {
                error!(correlation_id = %id, error = %e, "failed to store dispatch outcome");
            }
        }
    }

    /// Records the worker's out-of-band terminal outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when no record exists under `id`
    /// - [`Error::Expired`] when the record aged out; it is deleted
    /// - [`Error::Storage`] on ledger failure
    pub async fn complete(&self, id: &CorrelationId, update: CompletionUpdate) -> Result<Operation> {
        match self
            .ledger
            .complete(id, update, Utc::now(), self.config.ttl)
            .await?
        {
            CompletionOutcome::Applied(op) => {
                relay_metrics::record_completion(op.status);
                info!(correlation_id = %id, status = %op.status, "completion recorded");
                Ok(op)
            }
            CompletionOutcome::Expired => {
                relay_metrics::record_expirations(1);
                warn!(correlation_id = %id, "completion arrived after expiry");
                Err(Error::expired(id))
            }
            CompletionOutcome::Absent => Err(Error::not_found(id)),
        }
    }

    /// Reads the current status of an operation, enforcing lazy expiry.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger read fails; missing and expired
    /// records are reported through [`StatusReport`], not as errors.
    pub async fn status(&self, id: &CorrelationId) -> Result<StatusReport> {
        let now = Utc::now();
        match self.ledger.fetch_live(id, now, self.config.ttl).await? {
            LedgerEntry::Absent => Ok(StatusReport::NotFound),
            LedgerEntry::Expired => {
                relay_metrics::record_expirations(1);
                Ok(StatusReport::Expired)
            }
            LedgerEntry::Live(op) => Ok(match op.status {
                crate::op::OperationStatus::Pending => StatusReport::Pending {
                    elapsed_ms: op.elapsed_ms(now),
                },
                crate::op::OperationStatus::Completed => StatusReport::Completed {
                    result: op.result.unwrap_or(serde_json::Value::Null),
                },
                crate::op::OperationStatus::Error => StatusReport::Failed {
                    error: op
                        .error_message
                        .unwrap_or_else(|| "unknown error".to_string()),
                },
            }),
        }
    }

    /// Reaps expired records now; returns the count removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger sweep fails.
    pub async fn sweep_now(&self) -> Result<usize> {
        let removed = self.ledger.sweep(Utc::now(), self.config.ttl).await?;
        if removed > 0 {
            relay_metrics::record_expirations(removed);
        }
        Ok(removed)
    }

    /// Number of records currently in the ledger.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger read fails.
    pub async fn ledger_size(&self) -> Result<usize> {
        self.ledger.len().await
    }
}
