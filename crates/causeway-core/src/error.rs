//! Error types and result aliases shared across Causeway crates.
//!
//! Domain-specific errors (ledger, dispatch, client) live in their own crates;
//! this module covers only the failures that cross crate boundaries.

/// The result type used throughout Causeway.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core Causeway operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the identifier invalid.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new invalid-identifier error.
    #[must_use]
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_display_includes_message() {
        let err = Error::invalid_id("must not be empty");
        assert_eq!(err.to_string(), "invalid identifier: must not be empty");
    }

    #[test]
    fn invalid_input_display() {
        let err = Error::InvalidInput("ttl must be positive".to_string());
        assert_eq!(err.to_string(), "invalid input: ttl must be positive");
    }

    #[test]
    fn internal_display_includes_message() {
        let err = Error::internal("clock went backwards");
        assert_eq!(err.to_string(), "internal error: clock went backwards");
    }
}
