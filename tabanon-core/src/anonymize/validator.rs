//! Privacy validation of candidate partitions.
//!
//! A partition is valid when it satisfies, in order:
//! - **k-anonymity**: at least `k` records
//! - **l-diversity**: at least `l` distinct sensitive values
//! - **t-closeness**: every sensitive value present in the partition has a
//!   relative frequency within `t` of its global frequency
//!
//! The l and t checks only run when a sensitive column is configured and
//! the corresponding threshold is non-zero.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabAnonError};
use crate::models::{Dataset, RecordId, Value, ValueKey};

use super::config::PrivacyThresholds;
use super::models::Partition;

/// First privacy check a partition fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum PrivacyViolation {
    /// Fewer than `k` records
    KAnonymity { size: usize, k: usize },
    /// Fewer than `l` distinct sensitive values
    LDiversity { distinct: usize, l: usize },
    /// Sensitive distribution further than `t` from the global one
    TCloseness { distance: f64, t: f64 },
}

impl fmt::Display for PrivacyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivacyViolation::KAnonymity { size, k } => {
                write!(f, "{} records, k-anonymity requires {}", size, k)
            }
            PrivacyViolation::LDiversity { distinct, l } => {
                write!(
                    f,
                    "{} distinct sensitive values, l-diversity requires {}",
                    distinct, l
                )
            }
            PrivacyViolation::TCloseness { distance, t } => {
                write!(
                    f,
                    "distance {:.4} from global distribution exceeds t = {}",
                    distance, t
                )
            }
        }
    }
}

/// Relative frequency of each sensitive value over the whole dataset.
///
/// Computed once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct GlobalFrequency<'a> {
    frequencies: HashMap<ValueKey<'a>, f64>,
}

impl<'a> GlobalFrequency<'a> {
    /// Computes frequencies over every value in `values`.
    pub fn compute(values: &[ValueKey<'a>]) -> Self {
        Self {
            frequencies: relative_frequencies(values.iter().copied()),
        }
    }

    /// Global frequency of `value`; zero if it never occurs.
    pub fn get(&self, value: &ValueKey<'_>) -> f64 {
        self.frequencies.get(value).copied().unwrap_or(0.0)
    }

    /// Number of distinct sensitive values.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Returns true if there are no sensitive values.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

fn relative_frequencies<'a>(values: impl Iterator<Item = ValueKey<'a>>) -> HashMap<ValueKey<'a>, f64> {
    let mut counts: HashMap<ValueKey<'a>, usize> = HashMap::new();
    let mut total = 0usize;
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
        total += 1;
    }

    counts
        .into_iter()
        .map(|(value, count)| (value, count as f64 / total as f64))
        .collect()
}

/// Sensitive column bound to its data and global distribution.
#[derive(Debug, Clone)]
struct SensitiveColumn<'a> {
    values: Vec<ValueKey<'a>>,
    global: GlobalFrequency<'a>,
}

/// Decides whether candidate partitions satisfy the privacy thresholds.
#[derive(Debug, Clone)]
pub struct PrivacyValidator<'a> {
    thresholds: PrivacyThresholds,
    sensitive: Option<SensitiveColumn<'a>>,
}

impl<'a> PrivacyValidator<'a> {
    /// Creates a validator without a sensitive column (k-anonymity only).
    pub fn new(thresholds: PrivacyThresholds) -> Self {
        Self {
            thresholds,
            sensitive: None,
        }
    }

    /// Creates a validator over sensitive values indexed by record id.
    pub fn with_sensitive_values(thresholds: PrivacyThresholds, values: Vec<ValueKey<'a>>) -> Self {
        let global = GlobalFrequency::compute(&values);
        Self {
            thresholds,
            sensitive: Some(SensitiveColumn { values, global }),
        }
    }

    /// Creates a validator for `dataset`, binding the sensitive column if
    /// one is named.
    pub fn for_dataset(
        dataset: &'a Dataset,
        thresholds: PrivacyThresholds,
        sensitive_column: Option<&str>,
    ) -> Result<Self> {
        match sensitive_column {
            None => Ok(Self::new(thresholds)),
            Some(name) => {
                let column = dataset.column(name).ok_or_else(|| {
                    TabAnonError::configuration(format!("unknown sensitive column '{}'", name))
                })?;
                let values = column.values.iter().map(Value::key).collect();
                Ok(Self::with_sensitive_values(thresholds, values))
            }
        }
    }

    /// Thresholds this validator enforces.
    pub fn thresholds(&self) -> &PrivacyThresholds {
        &self.thresholds
    }

    /// Global sensitive-value distribution, if a sensitive column is bound.
    pub fn global_frequency(&self) -> Option<&GlobalFrequency<'a>> {
        self.sensitive.as_ref().map(|s| &s.global)
    }

    /// Returns true if `partition` satisfies every active check.
    ///
    /// # Panics
    /// Panics if `partition` holds a record id outside the sensitive
    /// values the validator was built from.
    pub fn is_valid(&self, partition: &Partition) -> bool {
        self.check(partition).is_none()
    }

    /// Returns the first failed check, or `None` if the partition is valid.
    ///
    /// # Panics
    /// Panics if `partition` holds a record id outside the sensitive
    /// values the validator was built from.
    pub fn check(&self, partition: &Partition) -> Option<PrivacyViolation> {
        let k = self.thresholds.k;
        if partition.len() < k {
            return Some(PrivacyViolation::KAnonymity {
                size: partition.len(),
                k,
            });
        }

        let sensitive = self.sensitive.as_ref()?;

        if self.thresholds.requires_l_diversity() {
            let distinct = sensitive.distinct_count(partition.records());
            if distinct < self.thresholds.l {
                return Some(PrivacyViolation::LDiversity {
                    distinct,
                    l: self.thresholds.l,
                });
            }
        }

        if self.thresholds.requires_t_closeness() {
            let distance = sensitive.max_distance(partition.records());
            if distance > self.thresholds.t {
                return Some(PrivacyViolation::TCloseness {
                    distance,
                    t: self.thresholds.t,
                });
            }
        }

        None
    }

    /// Largest `|p - q|` over the sensitive values present in `partition`.
    ///
    /// Zero without a sensitive column or for an empty partition.
    ///
    /// # Panics
    /// Panics if `partition` holds a record id outside the sensitive
    /// values the validator was built from.
    pub fn max_distance(&self, partition: &Partition) -> f64 {
        self.sensitive
            .as_ref()
            .map_or(0.0, |s| s.max_distance(partition.records()))
    }
}

impl<'a> SensitiveColumn<'a> {
    fn distinct_count(&self, records: &[RecordId]) -> usize {
        let distinct: std::collections::HashSet<_> =
            records.iter().map(|&id| self.values[id]).collect();
        distinct.len()
    }

    fn max_distance(&self, records: &[RecordId]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }

        relative_frequencies(records.iter().map(|&id| self.values[id]))
            .into_iter()
            .map(|(value, p)| {
                let q = self.global.frequencies.get(&value).copied().unwrap_or(0.0);
                (p - q).abs()
            })
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::numeric("age", [20.0, 21.0, 22.0, 23.0, 50.0, 51.0, 52.0, 53.0]),
            Column::text(
                "disease",
                ["flu", "flu", "flu", "cold", "flu", "cancer", "cold", "flu"],
            ),
        ])
        .unwrap()
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_record_panics() {
        let dataset = dataset();
        let validator = PrivacyValidator::for_dataset(
            &dataset,
            PrivacyThresholds::new(1).with_l(2),
            Some("disease"),
        )
        .unwrap();

        let _ = validator.check(&Partition::new(vec![0, 99]));
    }

    #[test]
    fn test_k_anonymity_only() {
        let validator = PrivacyValidator::new(PrivacyThresholds::new(3));

        assert!(validator.is_valid(&Partition::new(vec![0, 1, 2])));
        assert_eq!(
            validator.check(&Partition::new(vec![0, 1])),
            Some(PrivacyViolation::KAnonymity { size: 2, k: 3 })
        );
        assert!(!validator.is_valid(&Partition::new(vec![])));
    }

    #[test]
    fn test_l_diversity() {
        let dataset = dataset();
        let validator =
            PrivacyValidator::for_dataset(&dataset, PrivacyThresholds::new(2).with_l(2), Some("disease"))
                .unwrap();

        // flu, flu, flu
        assert_eq!(
            validator.check(&Partition::new(vec![0, 1, 2])),
            Some(PrivacyViolation::LDiversity { distinct: 1, l: 2 })
        );
        // flu, flu, flu, cold
        assert!(validator.is_valid(&Partition::new(vec![0, 1, 2, 3])));
    }

    #[test]
    fn test_k_checked_before_l() {
        let dataset = dataset();
        let validator =
            PrivacyValidator::for_dataset(&dataset, PrivacyThresholds::new(5).with_l(3), Some("disease"))
                .unwrap();

        assert!(matches!(
            validator.check(&Partition::new(vec![0])),
            Some(PrivacyViolation::KAnonymity { .. })
        ));
    }

    #[test]
    fn test_global_frequency() {
        let dataset = dataset();
        let validator = PrivacyValidator::for_dataset(
            &dataset,
            PrivacyThresholds::new(1).with_t(0.5),
            Some("disease"),
        )
        .unwrap();
        let global = validator.global_frequency().unwrap();

        assert_eq!(global.len(), 3);
        assert!((global.get(&ValueKey::Text("flu")) - 0.625).abs() < 1e-12);
        assert!((global.get(&ValueKey::Text("cold")) - 0.25).abs() < 1e-12);
        assert_eq!(global.get(&ValueKey::Text("measles")), 0.0);
    }

    #[test]
    fn test_t_closeness() {
        let dataset = dataset();
        let validator = PrivacyValidator::for_dataset(
            &dataset,
            PrivacyThresholds::new(1).with_t(0.2),
            Some("disease"),
        )
        .unwrap();

        // Whole dataset matches the global distribution exactly.
        assert!(validator.max_distance(&Partition::full(8)) < 1e-12);
        assert!(validator.is_valid(&Partition::full(8)));

        // flu x3: p(flu) = 1.0 vs 0.625
        let partition = Partition::new(vec![0, 1, 2]);
        assert!((validator.max_distance(&partition) - 0.375).abs() < 1e-12);
        assert!(matches!(
            validator.check(&partition),
            Some(PrivacyViolation::TCloseness { .. })
        ));

        // flu, flu, cold, flu: flu 0.75 (0.125), cold 0.25 (0.0); absent
        // cancer does not count.
        assert!(validator.is_valid(&Partition::new(vec![0, 1, 3, 4])));
    }

    #[test]
    fn test_disabled_checks_degenerate_to_k() {
        let dataset = dataset();
        let validator =
            PrivacyValidator::for_dataset(&dataset, PrivacyThresholds::new(2), Some("disease"))
                .unwrap();

        // Single distinct value, far from global: still valid with l = t = 0.
        assert!(validator.is_valid(&Partition::new(vec![0, 1])));
    }

    #[test]
    fn test_unknown_sensitive_column() {
        let dataset = dataset();
        let result =
            PrivacyValidator::for_dataset(&dataset, PrivacyThresholds::new(2), Some("salary"));
        assert!(result.is_err());
    }

    #[test]
    fn test_violation_display() {
        let violation = PrivacyViolation::LDiversity { distinct: 1, l: 2 };
        assert!(violation.to_string().contains("l-diversity requires 2"));

        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["check"], "l_diversity");
    }
}
