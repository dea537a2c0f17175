//! Error types for the relay domain.

use causeway_core::CorrelationId;

/// The result type used throughout causeway-relay.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in relay operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A submission or completion payload failed validation.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of what made the payload invalid.
        message: String,
    },

    /// No operation exists under the given correlation id.
    #[error("operation not found: {correlation_id}")]
    NotFound {
        /// The correlation id that was not found.
        correlation_id: String,
    },

    /// The operation aged past its time-to-live and was reaped.
    #[error("operation expired: {correlation_id}")]
    Expired {
        /// The correlation id of the expired operation.
        correlation_id: String,
    },

    /// Delivery to the external worker failed.
    #[error("dispatch failed: {message}")]
    Dispatch {
        /// Description of the dispatch failure.
        message: String,
    },

    /// A ledger storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// An error from causeway-core.
    #[error("core error: {0}")]
    Core(#[from] causeway_core::Error),
}

impl Error {
    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new not-found error for the given correlation id.
    #[must_use]
    pub fn not_found(correlation_id: &CorrelationId) -> Self {
        Self::NotFound {
            correlation_id: correlation_id.to_string(),
        }
    }

    /// Creates a new expired error for the given correlation id.
    #[must_use]
    pub fn expired(correlation_id: &CorrelationId) -> Self {
        Self::Expired {
            correlation_id: correlation_id.to_string(),
        }
    }

    /// Creates a new dispatch error.
    #[must_use]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = Error::validation("message must not be empty");
        assert_eq!(
            err.to_string(),
            "validation failed: message must not be empty"
        );
    }

    #[test]
    fn not_found_display_includes_id() {
        let id: CorrelationId = "conv-1".parse().unwrap();
        let err = Error::not_found(&id);
        assert!(err.to_string().contains("conv-1"));
    }

    #[test]
    fn core_error_converts() {
        let core = causeway_core::Error::invalid_id("empty");
        let err = Error::from(core);
        assert!(matches!(err, Error::Core(_)));
    }
}
