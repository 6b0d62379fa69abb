//! Unified error types for the cache layer.

use thiserror::Error;

/// Unified error type for Cairn.
///
/// Only [`CairnError::MalformedEntry`] and [`CairnError::Serialization`] ever
/// reach callers of the cache-aside operations. Backend errors are absorbed
/// by the resilient accessor and turned into misses or no-ops.
#[derive(Error, Debug)]
pub enum CairnError {
    // ============ Backend Errors ============
    /// The key-value store could not be reached or rejected the command
    #[error("Cache backend error: {0}")]
    Backend(String),

    // ============ Data Errors ============
    /// A stored entry could not be decoded into the requested shape
    #[error("Malformed cache entry at '{key}': {message}")]
    MalformedEntry { key: String, message: String },

    /// A value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CairnError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "BACKEND_UNAVAILABLE",
            Self::MalformedEntry { .. } => "MALFORMED_ENTRY",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend<T: Into<String>>(message: T) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a malformed entry error for the given key.
    #[must_use]
    pub fn malformed<K: Into<String>, M: ToString>(key: K, message: M) -> Self {
        Self::MalformedEntry {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is transient.
    ///
    /// Only backend failures qualify; a malformed entry stays malformed
    /// however many times it is read.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

impl From<serde_json::Error> for CairnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CairnError::backend("down").error_code(), "BACKEND_UNAVAILABLE");
        assert_eq!(CairnError::malformed("k", "bad").error_code(), "MALFORMED_ENTRY");
        assert_eq!(CairnError::Serialization("x".to_string()).error_code(), "SERIALIZATION_ERROR");
        assert_eq!(CairnError::configuration("missing").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(CairnError::internal("oops").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(CairnError::backend("connection refused").is_retriable());
        assert!(!CairnError::malformed("u:1", "expected value").is_retriable());
        assert!(!CairnError::configuration("bad url").is_retriable());
    }

    #[test]
    fn test_malformed_display_names_key() {
        let err = CairnError::malformed("orders", "expected `[`");
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("expected `[`"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = CairnError::from(json_err);
        assert!(matches!(err, CairnError::Serialization(_)));
    }

    #[test]
    fn test_from_anyhow() {
        let err: CairnError = anyhow::anyhow!("wrapped").into();
        assert_eq!(err.to_string(), "wrapped");
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
