//! Correlation identifiers for Causeway operations.
//!
//! A correlation id is the single key that ties together a submission, the
//! worker callback that completes it, and every status poll in between. Unlike
//! machine-minted ids, correlation ids are normally **caller-supplied**, so the
//! type validates on construction instead of trusting its input.
//!
//! Ids travel in URL paths, so construction rejects characters that cannot
//! appear raw in a path segment.
//!
//! # Example
//!
//! ```rust
//! use causeway_core::id::CorrelationId;
//!
//! let id: CorrelationId = "conv-2".parse().unwrap();
//! assert_eq!(id.as_str(), "conv-2");
//!
//! // Callers that don't care about the key can have one minted.
//! let minted = CorrelationId::generate();
//! assert!(!minted.as_str().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// Maximum accepted length of a correlation id, in bytes.
pub const MAX_CORRELATION_ID_LENGTH: usize = 256;

/// A caller-supplied key correlating a submission with its completion.
///
/// Guaranteed non-empty and path-safe once constructed. Comparison and
/// hashing are byte-exact; ids are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a correlation id from caller input.
    ///
    /// Leading and trailing whitespace is trimmed. Fails if the trimmed value
    /// is empty, longer than [`MAX_CORRELATION_ID_LENGTH`], or contains
    /// characters that cannot appear raw in a URL path segment.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_id("correlation id must not be empty"));
        }
        if trimmed.len() > MAX_CORRELATION_ID_LENGTH {
            return Err(Error::invalid_id(format!(
                "correlation id exceeds {MAX_CORRELATION_ID_LENGTH} bytes"
            )));
        }
        if let Some(ch) = trimmed
            .chars()
            .find(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '/' | '?' | '#' | '%'))
        {
            return Err(Error::invalid_id(format!(
                "correlation id contains forbidden character {ch:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Mints a fresh correlation id for callers that do not supply their own.
    ///
    /// Uses ULID generation which is:
    /// - Lexicographically sortable by creation time
    /// - Globally unique without coordination
    /// - URL-safe and case-insensitive
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_ids() {
        let id: CorrelationId = "conv-2".parse().unwrap();
        assert_eq!(id.as_str(), "conv-2");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = CorrelationId::new("  conv-2\n").unwrap();
        assert_eq!(id.as_str(), "conv-2");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(CorrelationId::new("").is_err());
        assert!(CorrelationId::new("   ").is_err());
    }

    #[test]
    fn rejects_path_breaking_characters() {
        assert!(CorrelationId::new("a/b").is_err());
        assert!(CorrelationId::new("a b").is_err());
        assert!(CorrelationId::new("a%20b").is_err());
    }

    #[test]
    fn rejects_overlong_ids() {
        let long = "x".repeat(MAX_CORRELATION_ID_LENGTH + 1);
        assert!(CorrelationId::new(long).is_err());
    }

    #[test]
    fn generated_ids_are_unique() {
        let id1 = CorrelationId::generate();
        let id2 = CorrelationId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn serde_roundtrip_preserves_value() {
        let id: CorrelationId = "conv-2".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"conv-2\"");
        let back: CorrelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn serde_rejects_invalid_wire_values() {
        let result: std::result::Result<CorrelationId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
