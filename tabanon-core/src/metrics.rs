//! Privacy metrics for released datasets.
//!
//! Records are grouped into equivalence classes by their exact
//! quasi-identifier tuple. The functions here report how well a dataset
//! (typically an anonymized one) resists re-identification:
//! - **k**: size of the smallest equivalence class
//! - **l**: fewest distinct sensitive values in any equivalence class
//! - **t**: largest distance between any class's sensitive distribution
//!   and the global one
//!
//! All metrics expose counts and distances only, never values.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anonymize::{Partition, PrivacyThresholds, PrivacyValidator};
use crate::error::{Result, TabAnonError};
use crate::models::{Dataset, RecordId, Value, ValueKey};

/// Groups records by their quasi-identifier tuple.
///
/// Classes are ordered by their first record; records within a class keep
/// row order.
pub fn equivalence_classes(
    dataset: &Dataset,
    quasi_identifiers: &[&str],
) -> Result<Vec<Partition>> {
    let columns = quasi_identifiers
        .iter()
        .map(|name| column_values(dataset, name))
        .collect::<Result<Vec<_>>>()?;

    let mut index: HashMap<Vec<ValueKey<'_>>, usize> = HashMap::new();
    let mut classes: Vec<Vec<RecordId>> = Vec::new();

    for id in 0..dataset.len() {
        let key: Vec<ValueKey<'_>> = columns.iter().map(|values| values[id].key()).collect();
        let slot = *index.entry(key).or_insert_with(|| {
            classes.push(Vec::new());
            classes.len() - 1
        });
        classes[slot].push(id);
    }

    Ok(classes.into_iter().map(Partition::new).collect())
}

/// Returns true if every equivalence class holds at least `k` records.
pub fn satisfies_k_anonymity(
    dataset: &Dataset,
    quasi_identifiers: &[&str],
    k: usize,
) -> Result<bool> {
    let classes = equivalence_classes(dataset, quasi_identifiers)?;
    let satisfied = classes.iter().all(|class| class.len() >= k);
    debug!("Dataset {} {}-anonymity", verdict(satisfied), k);
    Ok(satisfied)
}

/// Largest `k` for which the dataset is k-anonymous; 0 for an empty dataset.
pub fn find_k_anonymity(dataset: &Dataset, quasi_identifiers: &[&str]) -> Result<usize> {
    let classes = equivalence_classes(dataset, quasi_identifiers)?;
    Ok(min_class_size(&classes))
}

/// Returns true if every equivalence class holds at least `l` distinct
/// sensitive values.
pub fn satisfies_l_diversity(
    dataset: &Dataset,
    quasi_identifiers: &[&str],
    sensitive_column: &str,
    l: usize,
) -> Result<bool> {
    let classes = equivalence_classes(dataset, quasi_identifiers)?;
    let sensitive = column_values(dataset, sensitive_column)?;
    let satisfied = classes
        .iter()
        .all(|class| distinct_count(sensitive, class) >= l);
    debug!("Dataset {} {}-diversity", verdict(satisfied), l);
    Ok(satisfied)
}

/// Largest `l` for which the dataset is l-diverse; 0 for an empty dataset.
pub fn find_l_diversity(
    dataset: &Dataset,
    quasi_identifiers: &[&str],
    sensitive_column: &str,
) -> Result<usize> {
    let classes = equivalence_classes(dataset, quasi_identifiers)?;
    let sensitive = column_values(dataset, sensitive_column)?;
    Ok(min_distinct(sensitive, &classes))
}

/// Combined privacy metrics of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyMetrics {
    /// Number of records
    pub record_count: u64,
    /// Number of equivalence classes
    pub equivalence_class_count: usize,
    /// Largest k the dataset satisfies
    pub k_anonymity: usize,
    /// Largest l the dataset satisfies, if a sensitive column was given
    pub l_diversity: Option<usize>,
    /// Largest class distance from the global sensitive distribution, if a
    /// sensitive column was given
    pub t_closeness: Option<f64>,
}

impl PrivacyMetrics {
    /// Returns true if the metrics meet `thresholds`.
    ///
    /// Without a sensitive column only `k` is checked.
    pub fn satisfies(&self, thresholds: &PrivacyThresholds) -> bool {
        let l_ok = !thresholds.requires_l_diversity()
            || self.l_diversity.is_none_or(|l| l >= thresholds.l);
        let t_ok = !thresholds.requires_t_closeness()
            || self.t_closeness.is_none_or(|t| t <= thresholds.t);
        self.k_anonymity >= thresholds.k && l_ok && t_ok
    }
}

/// Measures k, and l and t when a sensitive column is given.
pub fn measure(
    dataset: &Dataset,
    quasi_identifiers: &[&str],
    sensitive_column: Option<&str>,
) -> Result<PrivacyMetrics> {
    let classes = equivalence_classes(dataset, quasi_identifiers)?;

    let (l_diversity, t_closeness) = match sensitive_column {
        Some(name) => {
            let sensitive = column_values(dataset, name)?;
            let validator =
                PrivacyValidator::for_dataset(dataset, PrivacyThresholds::new(1), Some(name))?;
            let t = classes
                .iter()
                .map(|class| validator.max_distance(class))
                .fold(0.0, f64::max);
            (Some(min_distinct(sensitive, &classes)), Some(t))
        }
        None => (None, None),
    };

    Ok(PrivacyMetrics {
        record_count: dataset.len() as u64,
        equivalence_class_count: classes.len(),
        k_anonymity: min_class_size(&classes),
        l_diversity,
        t_closeness,
    })
}

fn column_values<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a [Value]> {
    dataset
        .column(name)
        .map(|c| c.values.as_slice())
        .ok_or_else(|| TabAnonError::configuration(format!("unknown column '{}'", name)))
}

fn min_class_size(classes: &[Partition]) -> usize {
    classes.iter().map(Partition::len).min().unwrap_or(0)
}

fn distinct_count(values: &[Value], class: &Partition) -> usize {
    class
        .iter()
        .map(|id| values[id].key())
        .collect::<HashSet<_>>()
        .len()
}

fn min_distinct(values: &[Value], classes: &[Partition]) -> usize {
    classes
        .iter()
        .map(|class| distinct_count(values, class))
        .min()
        .unwrap_or(0)
}

fn verdict(satisfied: bool) -> &'static str {
    if satisfied { "satisfies" } else { "does not satisfy" }
}
