//! Anonymization configuration.
//!
//! This module provides the privacy thresholds, the quasi-identifier column
//! schema and the policies that control how partitions are aggregated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabAnonError};
use crate::models::Dataset;

/// How a quasi-identifier column is treated by span, split and aggregation.
///
/// Assigned once at configuration time; never inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Ordered numeric values: range span, median split, mean aggregation
    Numeric,
    /// Unordered categories: cardinality span, value-set split
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

impl FromStr for ColumnKind {
    type Err = TabAnonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "numeric" | "num" | "n" => Ok(ColumnKind::Numeric),
            "categorical" | "cat" | "c" => Ok(ColumnKind::Categorical),
            other => Err(TabAnonError::configuration(format!(
                "unknown column kind '{}', expected 'numeric' or 'categorical'",
                other
            ))),
        }
    }
}

/// A quasi-identifier column and its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuasiIdentifier {
    /// Column name
    pub name: String,
    /// Column kind
    pub kind: ColumnKind,
}

impl QuasiIdentifier {
    /// Creates a numeric quasi-identifier.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
        }
    }

    /// Creates a categorical quasi-identifier.
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
        }
    }
}

/// Parses `name:kind`; a bare `name` defaults to numeric.
impl FromStr for QuasiIdentifier {
    type Err = TabAnonError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, kind) = match s.rsplit_once(':') {
            Some((name, kind)) => (name.trim(), kind.parse()?),
            None => (s.trim(), ColumnKind::Numeric),
        };

        if name.is_empty() {
            return Err(TabAnonError::configuration(format!(
                "quasi-identifier '{}' has an empty column name",
                s
            )));
        }

        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }
}

/// Privacy thresholds a finished partition must meet.
///
/// `l = 0` disables l-diversity and `t = 0.0` disables t-closeness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrivacyThresholds {
    /// Minimum partition size
    pub k: usize,
    /// Minimum distinct sensitive values per partition
    #[serde(default)]
    pub l: usize,
    /// Maximum distance between partition and global sensitive distributions
    #[serde(default)]
    pub t: f64,
}

impl Default for PrivacyThresholds {
    fn default() -> Self {
        Self { k: 2, l: 0, t: 0.0 }
    }
}

impl PrivacyThresholds {
    /// Creates k-anonymity-only thresholds.
    pub fn new(k: usize) -> Self {
        Self { k, l: 0, t: 0.0 }
    }

    /// Builder method to require l-diversity.
    pub fn with_l(mut self, l: usize) -> Self {
        self.l = l;
        self
    }

    /// Builder method to require t-closeness.
    pub fn with_t(mut self, t: f64) -> Self {
        self.t = t;
        self
    }

    /// Returns true if the l-diversity check is active.
    pub fn requires_l_diversity(&self) -> bool {
        self.l > 0
    }

    /// Returns true if the t-closeness check is active.
    pub fn requires_t_closeness(&self) -> bool {
        self.t > 0.0
    }

    /// Validates the thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.k < 1 {
            return Err(TabAnonError::configuration(format!(
                "k must be at least 1, got {}",
                self.k
            )));
        }
        if !self.t.is_finite() || self.t < 0.0 {
            return Err(TabAnonError::configuration(format!(
                "t must be a finite value >= 0.0, got {}",
                self.t
            )));
        }
        Ok(())
    }
}

/// Aggregation policy for categorical quasi-identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalAggregation {
    /// Replace with the partition's distinct values, sorted and joined by `|`
    #[default]
    Generalize,
    /// Replace with the partition's most frequent value
    MostFrequent,
}

impl FromStr for CategoricalAggregation {
    type Err = TabAnonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "generalize" => Ok(Self::Generalize),
            "most_frequent" | "mode" => Ok(Self::MostFrequent),
            other => Err(TabAnonError::configuration(format!(
                "unknown categorical aggregation '{}'",
                other
            ))),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_showcase() -> usize {
    3
}

/// Complete configuration of an anonymization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Quasi-identifier columns, in tie-break order
    pub quasi_identifiers: Vec<QuasiIdentifier>,
    /// Column whose distribution l-diversity and t-closeness constrain
    #[serde(default)]
    pub sensitive_column: Option<String>,
    /// Privacy thresholds
    #[serde(default)]
    pub thresholds: PrivacyThresholds,
    /// Aggregation policy for categorical quasi-identifiers
    #[serde(default)]
    pub categorical_aggregation: CategoricalAggregation,
    /// Number of partitioning worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Number of partitions to log as a sample after a run
    #[serde(default = "default_showcase")]
    pub showcase_partitions: usize,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            quasi_identifiers: Vec::new(),
            sensitive_column: None,
            thresholds: PrivacyThresholds::default(),
            categorical_aggregation: CategoricalAggregation::default(),
            workers: default_workers(),
            showcase_partitions: default_showcase(),
        }
    }
}

impl AnonymizationConfig {
    /// Creates a configuration for the given quasi-identifiers.
    pub fn new(quasi_identifiers: Vec<QuasiIdentifier>) -> Self {
        Self {
            quasi_identifiers,
            ..Self::default()
        }
    }

    /// Builder method to set the sensitive column.
    pub fn with_sensitive_column(mut self, column: impl Into<String>) -> Self {
        self.sensitive_column = Some(column.into());
        self
    }

    /// Builder method to set the privacy thresholds.
    pub fn with_thresholds(mut self, thresholds: PrivacyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Builder method to set the categorical aggregation policy.
    pub fn with_categorical_aggregation(mut self, policy: CategoricalAggregation) -> Self {
        self.categorical_aggregation = policy;
        self
    }

    /// Builder method to set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder method to set the number of showcase partitions.
    pub fn with_showcase_partitions(mut self, count: usize) -> Self {
        self.showcase_partitions = count;
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TabAnonError::serialization("parsing anonymization config", e))
    }

    /// Validates the configuration independently of any dataset.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if self.quasi_identifiers.is_empty() {
            return Err(TabAnonError::configuration(
                "at least one quasi-identifier column is required",
            ));
        }

        for (i, qi) in self.quasi_identifiers.iter().enumerate() {
            if self.quasi_identifiers[..i].iter().any(|q| q.name == qi.name) {
                return Err(TabAnonError::configuration(format!(
                    "quasi-identifier '{}' is listed more than once",
                    qi.name
                )));
            }
        }

        if self.sensitive_column.is_none() {
            if self.thresholds.requires_l_diversity() {
                return Err(TabAnonError::configuration(format!(
                    "l = {} requires a sensitive column",
                    self.thresholds.l
                )));
            }
            if self.thresholds.requires_t_closeness() {
                return Err(TabAnonError::configuration(format!(
                    "t = {} requires a sensitive column",
                    self.thresholds.t
                )));
            }
        }

        if self.workers == 0 {
            return Err(TabAnonError::configuration("workers must be at least 1"));
        }

        Ok(())
    }

    /// Validates the configuration and checks every referenced column
    /// exists in `dataset`.
    pub fn validate_for(&self, dataset: &Dataset) -> Result<()> {
        self.validate()?;

        // Column lookups are meaningless without records or columns.
        if dataset.is_empty() && dataset.columns().is_empty() {
            return Ok(());
        }

        for qi in &self.quasi_identifiers {
            if dataset.column(&qi.name).is_none() {
                return Err(TabAnonError::configuration(format!(
                    "unknown quasi-identifier column '{}'",
                    qi.name
                )));
            }
        }

        if let Some(ref sensitive) = self.sensitive_column
            && dataset.column(sensitive).is_none()
        {
            return Err(TabAnonError::configuration(format!(
                "unknown sensitive column '{}'",
                sensitive
            )));
        }

        Ok(())
    }
}
