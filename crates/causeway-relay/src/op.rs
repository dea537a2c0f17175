//! Operation records and their lifecycle.
//!
//! An [`Operation`] tracks one unit of work handed to the external worker:
//! created `pending` at submission, transitioned to `completed` or `error` by
//! the worker callback (or by a failed dispatch), and reaped once it ages past
//! its time-to-live.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use causeway_core::CorrelationId;

/// State of an operation as stored in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Submitted; no terminal outcome recorded yet.
    Pending,
    /// The worker reported a result.
    Completed,
    /// The worker reported a failure, or dispatch failed.
    Error,
}

impl OperationStatus {
    /// Returns true for `completed` and `error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Terminal outcome applied to a pending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionUpdate {
    /// The worker produced a result.
    Success {
        /// Opaque result payload.
        result: Value,
    },
    /// The worker reported a failure, or delivery to it failed.
    Failure {
        /// Human-readable failure message.
        message: String,
    },
}

impl CompletionUpdate {
    /// The status this update transitions the record to.
    #[must_use]
    pub const fn status(&self) -> OperationStatus {
        match self {
            Self::Success { .. } => OperationStatus::Completed,
            Self::Failure { .. } => OperationStatus::Error,
        }
    }
}

/// One in-flight or settled unit of work.
///
/// `result` is populated iff `status == Completed`; `error_message` iff
/// `status == Error`. `created_at` is stamped once at submission and never
/// changes across transitions; expiry is always measured from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Correlation id linking submission, callback, and polls.
    pub correlation_id: CorrelationId,
    /// Current state.
    pub status: OperationStatus,
    /// Result payload, present only when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message, present only when errored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation instant; immutable across transitions.
    pub created_at: DateTime<Utc>,
}

impl Operation {
    /// Creates a fresh pending operation stamped with the current time.
    #[must_use]
    pub fn pending(correlation_id: CorrelationId) -> Self {
        Self::pending_at(correlation_id, Utc::now())
    }

    /// Creates a pending operation with an explicit creation instant.
    ///
    /// Primarily used by tests to backdate records and exercise expiry
    /// without waiting out the time-to-live.
    #[must_use]
    pub fn pending_at(correlation_id: CorrelationId, created_at: DateTime<Utc>) -> Self {
        Self {
            correlation_id,
            status: OperationStatus::Pending,
            result: None,
            error_message: None,
            created_at,
        }
    }

    /// Applies a terminal outcome, preserving `created_at`.
    ///
    /// A later update overwrites an earlier terminal state wholesale
    /// (last-write-wins); the previously stored payload is dropped.
    pub fn apply(&mut self, update: CompletionUpdate) {
        match update {
            CompletionUpdate::Success { result } => {
                self.status = OperationStatus::Completed;
                self.result = Some(result);
                self.error_message = None;
            }
            CompletionUpdate::Failure { message } => {
                self.status = OperationStatus::Error;
                self.result = None;
                self.error_message = Some(message);
            }
        }
    }

    /// Returns true once the record has aged past `ttl`, regardless of status.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }

    /// Milliseconds elapsed since creation, clamped to zero.
    #[must_use]
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.created_at).num_milliseconds()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> CorrelationId {
        s.parse().unwrap()
    }

    #[test]
    fn pending_has_no_payload() {
        let op = Operation::pending(id("conv-1"));
        assert_eq!(op.status, OperationStatus::Pending);
        assert!(op.result.is_none());
        assert!(op.error_message.is_none());
        assert!(!op.status.is_terminal());
    }

    #[test]
    fn apply_success_preserves_created_at() {
        let mut op = Operation::pending(id("conv-1"));
        let created_at = op.created_at;

        op.apply(CompletionUpdate::Success {
            result: json!("Hello"),
        });

        assert_eq!(op.status, OperationStatus::Completed);
        assert_eq!(op.result, Some(json!("Hello")));
        assert!(op.error_message.is_none());
        assert_eq!(op.created_at, created_at);
    }

    #[test]
    fn apply_failure_clears_result() {
        let mut op = Operation::pending(id("conv-1"));
        op.apply(CompletionUpdate::Success {
            result: json!({"answer": 42}),
        });
        op.apply(CompletionUpdate::Failure {
            message: "worker gave up".to_string(),
        });

        assert_eq!(op.status, OperationStatus::Error);
        assert!(op.result.is_none());
        assert_eq!(op.error_message.as_deref(), Some("worker gave up"));
    }

    #[test]
    fn expiry_is_measured_from_created_at() {
        let created = Utc::now() - Duration::minutes(6);
        let op = Operation::pending_at(id("conv-1"), created);

        assert!(op.is_expired(Utc::now(), Duration::minutes(5)));
        assert!(!op.is_expired(Utc::now(), Duration::minutes(10)));
    }

    #[test]
    fn completed_records_still_expire() {
        let created = Utc::now() - Duration::minutes(6);
        let mut op = Operation::pending_at(id("conv-1"), created);
        op.apply(CompletionUpdate::Success {
            result: json!("done"),
        });

        assert!(op.is_expired(Utc::now(), Duration::minutes(5)));
    }

    #[test]
    fn elapsed_ms_clamps_negative_to_zero() {
        let op = Operation::pending_at(id("conv-1"), Utc::now() + Duration::seconds(10));
        assert_eq!(op.elapsed_ms(Utc::now()), 0);
    }

    #[test]
    fn serde_uses_camel_case_and_skips_absent_payloads() {
        let op = Operation::pending_at(id("conv-1"), Utc::now());
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["correlationId"], "conv-1");
        assert_eq!(json["status"], "pending");
        assert!(json.get("result").is_none());
        assert!(json.get("errorMessage").is_none());
    }
}
