//! Core library for tabanon: privacy-preserving anonymization of tabular
//! data.
//!
//! This crate provides the dataset model, the Mondrian anonymization
//! engine, privacy metrics for released data and column pseudonymization.
//! The `tabanon` binary is a thin CLI over it.
//!
//! # Security Guarantees
//! - Input datasets are never modified; every operation returns a copy
//! - Logs, errors and reports never contain quasi-identifier or sensitive
//!   values
//! - No network access, no global state
//!
//! # Architecture
//! - `models`: column-oriented datasets and cell values
//! - `anonymize`: span, split, validation, partitioning and aggregation
//! - `metrics`: equivalence-class based k / l / t measurement
//! - `pseudonymize`: SHA-256 value substitution with a reversible mapping

pub mod anonymize;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pseudonymize;

// Re-export commonly used types
pub use anonymize::{
    AnonymizationConfig, AnonymizationReport, AnonymizationResult, Anonymizer,
    CategoricalAggregation, ColumnKind, Partition, PrivacyThresholds, QuasiIdentifier, RunContext,
};
pub use error::{Result, TabAnonError};
pub use logging::{LogFormat, init_logging};
pub use metrics::PrivacyMetrics;
pub use models::{Column, Dataset, RecordId, Value};
pub use pseudonymize::{PseudonymMapping, pseudonymize_column};
