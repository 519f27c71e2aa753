//! Mondrian partitioning.
//!
//! The partitioner drains a FIFO work queue seeded with the whole dataset.
//! Each partition is split on the widest (normalized) column whose split
//! leaves two non-empty, valid halves; partitions no column can split are
//! finished. Partitions in the queue are disjoint and their fate depends
//! only on their own records, so a pool of workers can drain the queue
//! concurrently and still produce the same set of partitions.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{Result, TabAnonError};
use crate::models::Dataset;

use super::column::QiColumn;
use super::config::AnonymizationConfig;
use super::context::{Progress, RunContext};
use super::models::{Partition, PartitionOutcome, SpanMap};
use super::span::spans;
use super::split::split;
use super::validator::PrivacyValidator;

/// Idle workers re-check the deadline at this interval.
const WORKER_WAIT: Duration = Duration::from_millis(10);

/// Recursive-split driver over an explicit work queue.
#[derive(Debug, Clone)]
pub struct MondrianPartitioner<'a> {
    columns: Vec<QiColumn<'a>>,
    validator: PrivacyValidator<'a>,
    record_count: usize,
    workers: usize,
}

impl<'a> MondrianPartitioner<'a> {
    /// Creates a partitioner over bound quasi-identifier columns.
    ///
    /// `record_count` is the number of records in the bound dataset.
    pub fn new(
        columns: Vec<QiColumn<'a>>,
        validator: PrivacyValidator<'a>,
        record_count: usize,
    ) -> Self {
        Self {
            columns,
            validator,
            record_count,
            workers: 1,
        }
    }

    /// Validates `config` against `dataset` and binds its columns.
    pub fn from_config(dataset: &'a Dataset, config: &'a AnonymizationConfig) -> Result<Self> {
        config.validate_for(dataset)?;

        if dataset.is_empty() {
            return Ok(Self::new(
                Vec::new(),
                PrivacyValidator::new(config.thresholds),
                0,
            )
            .with_workers(config.workers));
        }

        let columns = QiColumn::bind_all(dataset, &config.quasi_identifiers)?;
        let validator = PrivacyValidator::for_dataset(
            dataset,
            config.thresholds,
            config.sensitive_column.as_deref(),
        )?;

        Ok(Self::new(columns, validator, dataset.len()).with_workers(config.workers))
    }

    /// Builder method to set the worker count (at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Validator used to accept or reject splits.
    pub fn validator(&self) -> &PrivacyValidator<'a> {
        &self.validator
    }

    /// Partitions the dataset.
    ///
    /// Finished partitions are pairwise disjoint and, together with any
    /// unfinished ones, cover every record. Both are ordered by their first
    /// record so sequential and parallel runs compare equal.
    pub fn partition(&self, ctx: &RunContext) -> Result<PartitionOutcome> {
        if self.record_count == 0 {
            return Ok(PartitionOutcome::default());
        }
        if self.columns.is_empty() {
            return Err(TabAnonError::configuration(
                "at least one quasi-identifier column is required",
            ));
        }

        let root = Partition::full(self.record_count);
        let root_violation = self.validator.check(&root);
        if let Some(ref violation) = root_violation {
            warn!(
                "Dataset as a whole fails the privacy thresholds ({}); it will be kept as a single partition",
                violation
            );
        }

        let scale = spans(&self.columns, &root, None);

        let mut outcome = if self.workers > 1 {
            debug!("Partitioning {} records with {} workers", self.record_count, self.workers);
            self.run_parallel(root, &scale, ctx)
        } else {
            self.run_sequential(root, &scale, ctx)
        };

        outcome.finished.sort_by_key(Partition::first);
        outcome.unfinished.sort_by_key(Partition::first);
        outcome.root_violation = root_violation;

        if outcome.timed_out {
            warn!(
                "Partitioning deadline reached: {} partitions finished, {} left unfinished",
                outcome.finished.len(),
                outcome.unfinished.len()
            );
        }

        Ok(outcome)
    }

    /// Tries each column in descending span order and returns the first
    /// split whose halves are both non-empty and valid.
    fn try_split(&self, partition: &Partition, scale: &SpanMap) -> Option<(Partition, Partition)> {
        let spans = spans(&self.columns, partition, Some(scale));

        for index in spans.split_order() {
            let column = &self.columns[index];
            let (left, right) = split(column, partition);

            if left.is_empty() || right.is_empty() {
                trace!("Column '{}' cannot split {} records", column.name(), partition.len());
                continue;
            }

            if self.validator.is_valid(&left) && self.validator.is_valid(&right) {
                trace!(
                    "Split {} records on '{}' into {} + {}",
                    partition.len(),
                    column.name(),
                    left.len(),
                    right.len()
                );
                return Some((left, right));
            }
        }

        None
    }

    fn run_sequential(&self, root: Partition, scale: &SpanMap, ctx: &RunContext) -> PartitionOutcome {
        let mut queue = VecDeque::from([root]);
        let mut outcome = PartitionOutcome::default();

        while !queue.is_empty() {
            if ctx.is_expired() {
                outcome.timed_out = true;
                break;
            }
            let Some(partition) = queue.pop_front() else {
                break;
            };
            outcome.iterations += 1;

            match self.try_split(&partition, scale) {
                Some((left, right)) => {
                    outcome.splits += 1;
                    queue.push_back(left);
                    queue.push_back(right);
                }
                None => outcome.finished.push(partition),
            }

            ctx.report(&Progress {
                iterations: outcome.iterations,
                splits: outcome.splits,
                queued: queue.len(),
                finished: outcome.finished.len(),
            });
        }

        outcome.unfinished = queue.into();
        outcome
    }

    fn run_parallel(&self, root: Partition, scale: &SpanMap, ctx: &RunContext) -> PartitionOutcome {
        let shared = SharedQueue {
            queue: VecDeque::from([root]),
            in_flight: 0,
            outcome: PartitionOutcome::default(),
        };
        let state = Mutex::new(shared);
        let ready = Condvar::new();

        thread::scope(|scope| {
            for worker in 0..self.workers {
                let state = &state;
                let ready = &ready;
                scope.spawn(move || self.work(worker, state, ready, scale, ctx));
            }
        });

        let shared = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut outcome = shared.outcome;
        outcome.unfinished = shared.queue.into();
        outcome
    }

    fn work(
        &self,
        worker: usize,
        state: &Mutex<SharedQueue>,
        ready: &Condvar,
        scale: &SpanMap,
        ctx: &RunContext,
    ) {
        trace!("Partition worker {} started", worker);

        while let Some(partition) = next_partition(state, ready, ctx) {
            let result = self.try_split(&partition, scale);

            let progress = {
                let mut shared = lock(state);
                shared.in_flight -= 1;
                match result {
                    Some((left, right)) => {
                        shared.outcome.splits += 1;
                        shared.queue.push_back(left);
                        shared.queue.push_back(right);
                    }
                    None => shared.outcome.finished.push(partition),
                }
                ready.notify_all();
                shared.progress()
            };

            ctx.report(&progress);
        }

        trace!("Partition worker {} stopped", worker);
    }
}

/// Queue state shared by partition workers.
struct SharedQueue {
    queue: VecDeque<Partition>,
    in_flight: usize,
    outcome: PartitionOutcome,
}

impl SharedQueue {
    fn progress(&self) -> Progress {
        Progress {
            iterations: self.outcome.iterations,
            splits: self.outcome.splits,
            queued: self.queue.len(),
            finished: self.outcome.finished.len(),
        }
    }
}

fn lock(state: &Mutex<SharedQueue>) -> MutexGuard<'_, SharedQueue> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Blocks until a partition is available, returning `None` once the queue
/// is drained with nothing in flight or the deadline has passed.
fn next_partition(
    state: &Mutex<SharedQueue>,
    ready: &Condvar,
    ctx: &RunContext,
) -> Option<Partition> {
    let mut shared = lock(state);
    loop {
        if shared.outcome.timed_out {
            return None;
        }
        if ctx.is_expired() {
            shared.outcome.timed_out = true;
            ready.notify_all();
            return None;
        }
        if let Some(partition) = shared.queue.pop_front() {
            shared.in_flight += 1;
            shared.outcome.iterations += 1;
            return Some(partition);
        }
        if shared.in_flight == 0 {
            ready.notify_all();
            return None;
        }
        shared = ready
            .wait_timeout(shared, WORKER_WAIT)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
}
