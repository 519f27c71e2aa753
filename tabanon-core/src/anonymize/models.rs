//! Partition and report models.
//!
//! Reports expose record identities, sizes and counters only, never the
//! original quasi-identifier or sensitive values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RecordId;

use super::config::PrivacyThresholds;
use super::validator::PrivacyViolation;

/// An immutable, ordered set of record identities.
///
/// Membership is fixed at creation; splitting produces new partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition {
    records: Vec<RecordId>,
}

impl Partition {
    /// Creates a partition from record identities.
    pub fn new(records: Vec<RecordId>) -> Self {
        Self { records }
    }

    /// Partition holding every record of a dataset with `len` records.
    pub fn full(len: usize) -> Self {
        Self::new((0..len).collect())
    }

    /// Record identities, in order.
    pub fn records(&self) -> &[RecordId] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the partition holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record identity, used to order finished partitions.
    pub fn first(&self) -> Option<RecordId> {
        self.records.first().copied()
    }

    /// Iterates over record identities.
    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.iter().copied()
    }
}

impl From<Vec<RecordId>> for Partition {
    fn from(records: Vec<RecordId>) -> Self {
        Self::new(records)
    }
}

/// Per-column spans of one partition, in quasi-identifier order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanMap {
    entries: Vec<(String, f64)>,
}

impl SpanMap {
    /// Creates a span map from `(column, span)` pairs.
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    /// Span of `column`, if present.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, span)| *span)
    }

    /// Entries in quasi-identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(name, span)| (name.as_str(), *span))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no column is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column positions ordered by descending span.
    ///
    /// The sort is stable, so exact ties keep quasi-identifier order.
    pub fn split_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[b].1.total_cmp(&self.entries[a].1));
        order
    }
}

/// Result of a partitioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionOutcome {
    /// Partitions that could not be split further, ordered by first record
    pub finished: Vec<Partition>,
    /// Partitions still queued when the deadline expired
    pub unfinished: Vec<Partition>,
    /// Queue iterations performed
    pub iterations: usize,
    /// Accepted splits
    pub splits: usize,
    /// Whether the run stopped at its deadline
    pub timed_out: bool,
    /// First threshold the whole dataset fails, if any
    pub root_violation: Option<PrivacyViolation>,
}

impl PartitionOutcome {
    /// Finished partitions followed by unfinished ones.
    pub fn all_partitions(&self) -> impl Iterator<Item = &Partition> + '_ {
        self.finished.iter().chain(self.unfinished.iter())
    }

    /// Consumes the outcome, returning every partition.
    pub fn into_partitions(self) -> Vec<Partition> {
        let mut partitions = self.finished;
        partitions.extend(self.unfinished);
        partitions
    }
}

/// Summary of an anonymization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationReport {
    /// Number of input records
    pub record_count: u64,
    /// Thresholds the run was configured with
    pub thresholds: PrivacyThresholds,
    /// Number of partitions in the output (finished and unfinished)
    pub partition_count: usize,
    /// Number of partitions left unfinished by a deadline
    pub unfinished_count: usize,
    /// Size of every partition, finished first
    pub partition_sizes: Vec<usize>,
    /// Smallest partition size
    pub min_partition_size: usize,
    /// Largest partition size
    pub max_partition_size: usize,
    /// Mean partition size
    pub mean_partition_size: f64,
    /// Queue iterations performed
    pub iterations: usize,
    /// Accepted splits
    pub splits: usize,
    /// Whether the run stopped at its deadline
    pub timed_out: bool,
    /// First threshold the whole dataset fails, if any
    pub root_violation: Option<PrivacyViolation>,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
}

impl AnonymizationReport {
    /// Creates an empty report.
    pub fn new(record_count: u64, thresholds: PrivacyThresholds) -> Self {
        Self {
            record_count,
            thresholds,
            partition_count: 0,
            unfinished_count: 0,
            partition_sizes: Vec::new(),
            min_partition_size: 0,
            max_partition_size: 0,
            mean_partition_size: 0.0,
            iterations: 0,
            splits: 0,
            timed_out: false,
            root_violation: None,
            duration_ms: 0,
            generated_at: Utc::now(),
        }
    }

    /// Fills partition statistics and counters from a partitioning outcome.
    pub fn with_outcome(mut self, outcome: &PartitionOutcome) -> Self {
        self.partition_sizes = outcome.all_partitions().map(Partition::len).collect();
        self.partition_count = self.partition_sizes.len();
        self.unfinished_count = outcome.unfinished.len();
        self.min_partition_size = self.partition_sizes.iter().copied().min().unwrap_or(0);
        self.max_partition_size = self.partition_sizes.iter().copied().max().unwrap_or(0);
        self.mean_partition_size = if self.partition_count == 0 {
            0.0
        } else {
            self.partition_sizes.iter().sum::<usize>() as f64 / self.partition_count as f64
        };
        self.iterations = outcome.iterations;
        self.splits = outcome.splits;
        self.timed_out = outcome.timed_out;
        self.root_violation = outcome.root_violation.clone();
        self
    }

    /// Sets the run duration.
    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns true if every partition meets the configured thresholds.
    ///
    /// False when the whole dataset already failed them or when the run
    /// stopped before finishing.
    pub fn is_compliant(&self) -> bool {
        self.root_violation.is_none() && !self.timed_out
    }
}
