//! Error types for the anonymization toolkit.
//!
//! Every error is raised before any partition is produced: configuration and
//! dataset shape problems are detected up front, and per-partition
//! conditions (unsplittable columns, exhausted quasi-identifiers) are
//! resolved by the partitioner's policy instead of being reported.

use thiserror::Error;

/// Main error type for tabanon operations.
#[derive(Debug, Error)]
pub enum TabAnonError {
    /// Invalid thresholds, unknown columns, or mistyped quasi-identifiers
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Dataset could not be built from the supplied rows
    #[error("Invalid dataset: {message}")]
    InvalidDataset { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with TabAnonError
pub type Result<T> = std::result::Result<T, TabAnonError>;

impl TabAnonError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an invalid dataset error
    pub fn invalid_dataset(message: impl Into<String>) -> Self {
        Self::InvalidDataset {
            message: message.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns true if this error was caused by invalid configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = TabAnonError::configuration("k must be at least 1");
        assert!(error.to_string().contains("k must be at least 1"));
        assert!(error.is_configuration());

        let error = TabAnonError::invalid_dataset("row 3 is not an object");
        assert!(error.to_string().contains("row 3"));
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_serialization_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = TabAnonError::serialization("parsing input rows", source);

        assert!(error.to_string().contains("parsing input rows"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
