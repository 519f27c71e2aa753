//! Anonymizer facade.
//!
//! Runs the full pipeline: validate configuration, partition, aggregate,
//! report.

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::Dataset;

use super::aggregate::aggregate;
use super::config::AnonymizationConfig;
use super::context::RunContext;
use super::models::{AnonymizationReport, Partition, PartitionOutcome};
use super::partitioner::MondrianPartitioner;

/// Output of an anonymization run.
#[derive(Debug, Clone)]
pub struct AnonymizationResult {
    /// Anonymized copy of the input dataset
    pub dataset: Dataset,
    /// Partitions the records were grouped into, finished first
    pub partitions: Vec<Partition>,
    /// Run summary
    pub report: AnonymizationReport,
}

/// Mondrian anonymizer for tabular datasets.
///
/// # Example
///
/// ```rust,ignore
/// use tabanon_core::anonymize::{
///     AnonymizationConfig, Anonymizer, PrivacyThresholds, QuasiIdentifier, RunContext,
/// };
///
/// let config = AnonymizationConfig::new(vec![
///     QuasiIdentifier::numeric("age"),
///     QuasiIdentifier::categorical("zip"),
/// ])
/// .with_sensitive_column("disease")
/// .with_thresholds(PrivacyThresholds::new(5).with_l(2));
///
/// let result = Anonymizer::new(config).anonymize(&dataset, &RunContext::new())?;
/// println!("{} partitions", result.report.partition_count);
/// ```
#[derive(Debug, Clone)]
pub struct Anonymizer {
    config: AnonymizationConfig,
}

impl Anonymizer {
    /// Creates a new anonymizer with the given configuration.
    pub fn new(config: AnonymizationConfig) -> Self {
        Self { config }
    }

    /// Returns a reference to the anonymizer configuration.
    pub fn config(&self) -> &AnonymizationConfig {
        &self.config
    }

    /// Anonymizes `dataset`.
    ///
    /// The input is never modified. All configuration errors are raised
    /// before partitioning starts. An empty dataset produces an empty
    /// result with the same columns.
    pub fn anonymize(&self, dataset: &Dataset, ctx: &RunContext) -> Result<AnonymizationResult> {
        let started = Instant::now();
        self.config.validate_for(dataset)?;

        let thresholds = self.config.thresholds;
        info!(
            "Anonymizing {} records on {} quasi-identifiers (k = {}, l = {}, t = {})",
            dataset.len(),
            self.config.quasi_identifiers.len(),
            thresholds.k,
            thresholds.l,
            thresholds.t
        );

        if dataset.is_empty() {
            return Ok(AnonymizationResult {
                dataset: dataset.clone(),
                partitions: Vec::new(),
                report: AnonymizationReport::new(0, thresholds)
                    .with_duration(started.elapsed()),
            });
        }

        let partitioner = MondrianPartitioner::from_config(dataset, &self.config)?;
        let outcome = partitioner.partition(ctx)?;
        self.log_showcase(&partitioner, &outcome, ctx.seed());

        let report =
            AnonymizationReport::new(dataset.len() as u64, thresholds).with_outcome(&outcome);
        let partitions = outcome.into_partitions();

        let output = aggregate(
            dataset,
            &partitions,
            &self.config.quasi_identifiers,
            self.config.sensitive_column.as_deref(),
            self.config.categorical_aggregation,
        )?;

        let report = report.with_duration(started.elapsed());
        info!(
            "Grouped {} records into {} partitions (sizes {}..={}) in {} ms",
            report.record_count,
            report.partition_count,
            report.min_partition_size,
            report.max_partition_size,
            report.duration_ms
        );

        Ok(AnonymizationResult {
            dataset: output,
            partitions,
            report,
        })
    }

    /// Logs a seeded random sample of finished partitions.
    ///
    /// Only sizes and distances are logged, never record values.
    fn log_showcase(
        &self,
        partitioner: &MondrianPartitioner<'_>,
        outcome: &PartitionOutcome,
        seed: u64,
    ) {
        let available = outcome.finished.len();
        let amount = self.config.showcase_partitions.min(available);
        if amount == 0 {
            return;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = index::sample(&mut rng, available, amount).into_vec();
        picked.sort_unstable();

        let validator = partitioner.validator();
        for i in picked {
            let partition = &outcome.finished[i];
            debug!(
                "Partition #{}: {} records, first record {}, max distance {:.4}",
                i,
                partition.len(),
                partition.first().unwrap_or_default(),
                validator.max_distance(partition)
            );
        }
    }
}
