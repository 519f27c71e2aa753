//! Mondrian anonymization.
//!
//! Records are recursively split into partitions along quasi-identifier
//! columns until no split keeps both halves within the privacy thresholds:
//! - **k-anonymity**: every partition holds at least `k` records
//! - **l-diversity**: at least `l` distinct sensitive values per partition
//! - **t-closeness**: each partition's sensitive distribution stays within
//!   `t` of the global one
//!
//! Each partition's quasi-identifiers are then replaced by one
//! representative value.
//!
//! # Security Guarantees
//! - Logs and reports expose record ids, sizes and distances only, never
//!   quasi-identifier or sensitive values
//! - Input datasets are never modified
//!
//! # Example
//! ```rust,ignore
//! use tabanon_core::anonymize::{AnonymizationConfig, Anonymizer, QuasiIdentifier, RunContext};
//!
//! let config = AnonymizationConfig::new(vec![QuasiIdentifier::numeric("age")]);
//! let result = Anonymizer::new(config).anonymize(&dataset, &RunContext::new())?;
//! ```

mod aggregate;
mod anonymizer;
mod column;
mod config;
mod context;
mod models;
mod partitioner;
mod span;
mod split;
mod validator;

// Re-export public API
pub use aggregate::{GENERALIZED_SEPARATOR, aggregate};
pub use anonymizer::{AnonymizationResult, Anonymizer};
pub use column::{CategoricalColumn, NumericColumn, QiColumn};
pub use config::{
    AnonymizationConfig, CategoricalAggregation, ColumnKind, PrivacyThresholds, QuasiIdentifier,
};
pub use context::{Progress, ProgressCallback, RunContext};
pub use models::{AnonymizationReport, Partition, PartitionOutcome, SpanMap};
pub use partitioner::MondrianPartitioner;
pub use span::{column_span, spans};
pub use split::split;
pub use validator::{GlobalFrequency, PrivacyValidator, PrivacyViolation};
