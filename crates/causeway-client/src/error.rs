//! Error types for the polling client.

/// The result type used throughout causeway-client.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to callers of the polling client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The relay rejected the submission as invalid.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// The relay's rejection message.
        message: String,
    },

    /// Submission failed after exhausting all retry attempts.
    #[error("submission failed after {attempts} attempts: {message}")]
    SubmissionFailed {
        /// How many attempts were made.
        attempts: u32,
        /// The final failure.
        message: String,
    },

    /// The operation settled with a stored error.
    #[error("operation failed: {message}")]
    OperationFailed {
        /// The stored failure message.
        message: String,
    },

    /// The relay does not know this operation.
    #[error("operation not found: {correlation_id}")]
    NotFound {
        /// The unknown correlation id.
        correlation_id: String,
    },

    /// The operation aged out before it was observed settling.
    #[error("operation expired: {correlation_id}")]
    Expired {
        /// The correlation id of the expired operation.
        correlation_id: String,
    },

    /// The poll deadline elapsed without a terminal status.
    #[error("poll deadline exceeded after {waited_ms}ms")]
    DeadlineExceeded {
        /// How long the client polled before giving up.
        waited_ms: u64,
    },

    /// An HTTP transport failure the client could not recover from.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

impl ClientError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true when the operation itself failed, as opposed to the
    /// client failing to observe it.
    #[must_use]
    pub const fn is_operation_failure(&self) -> bool {
        matches!(self, Self::OperationFailed { .. })
    }

    /// Returns true when retrying the whole submission could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubmissionFailed { .. } | Self::DeadlineExceeded { .. } | Self::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_display_includes_wait() {
        let err = ClientError::DeadlineExceeded { waited_ms: 180_000 };
        assert!(err.to_string().contains("180000ms"));
    }

    #[test]
    fn operation_failure_is_not_retryable() {
        let err = ClientError::OperationFailed {
            message: "worker gave up".to_string(),
        };
        assert!(err.is_operation_failure());
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_is_retryable() {
        assert!(ClientError::transport("connection reset").is_retryable());
    }
}
