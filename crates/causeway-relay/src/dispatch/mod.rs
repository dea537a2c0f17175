//! Delivery of submitted work to the external worker.
//!
//! The [`WorkerDispatcher`] trait is the seam between the relay and whatever
//! actually performs the work. The production implementation is the HTTP
//! dispatcher in [`http`]; tests substitute mocks that resolve instantly.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::op::CompletionUpdate;

pub use http::{DispatchMode, HttpDispatcher};

/// Payload handed to the worker for one operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDispatchRequest {
    /// Correlation id the worker must echo back in its callback.
    pub correlation_id: String,
    /// The submitted message text.
    pub message: String,
    /// Absolute URL the worker posts its terminal outcome to.
    pub callback_url: String,
    /// When the relay accepted the submission.
    pub submitted_at: DateTime<Utc>,
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The worker accepted the request and will call back later.
    Accepted,
    /// The worker resolved the request inline; no callback will come.
    Resolved(CompletionUpdate),
    /// Delivery failed.
    Failed {
        /// Description of the failure.
        message: String,
        /// Whether another attempt could plausibly succeed.
        retryable: bool,
    },
}

impl DispatchOutcome {
    /// Returns true when a retry is worth attempting.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { retryable: true, .. })
    }
}

/// Delivers operations to the external worker.
///
/// Implementations report failures through [`DispatchOutcome::Failed`] rather
/// than an error type; the relay turns exhausted or non-retryable failures
/// into stored error records.
#[async_trait]
pub trait WorkerDispatcher: Send + Sync {
    /// Attempts to deliver one operation to the worker.
    async fn dispatch(&self, request: &WorkerDispatchRequest) -> DispatchOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_failures_are_retryable() {
        assert!(DispatchOutcome::Failed {
            message: "503".to_string(),
            retryable: true,
        }
        .is_retryable());
        assert!(!DispatchOutcome::Failed {
            message: "400".to_string(),
            retryable: false,
        }
        .is_retryable());
        assert!(!DispatchOutcome::Accepted.is_retryable());
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = WorkerDispatchRequest {
            correlation_id: "conv-1".to_string(),
            message: "hello".to_string(),
            callback_url: "http://localhost:8080/api/v1/operations/conv-1/complete".to_string(),
            submitted_at: Utc::now(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["correlationId"], "conv-1");
        assert!(json.get("callbackUrl").is_some());
        assert!(json.get("submittedAt").is_some());
    }
}
