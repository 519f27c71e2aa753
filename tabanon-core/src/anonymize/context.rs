//! Per-run context: seed, progress reporting and deadline.
//!
//! Nothing about a run is global. Callers that want progress output or a
//! bounded run time pass it in here.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Snapshot of partitioner progress, reported after every queue iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    /// Queue iterations performed so far
    pub iterations: usize,
    /// Accepted splits so far
    pub splits: usize,
    /// Partitions waiting in the queue
    pub queued: usize,
    /// Partitions finished so far
    pub finished: usize,
}

/// Callback receiving progress snapshots. May be called from worker threads.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Explicit context for one anonymization run.
#[derive(Clone, Default)]
pub struct RunContext {
    seed: u64,
    progress: Option<ProgressCallback>,
    deadline: Option<Instant>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("seed", &self.seed)
            .field("progress", &self.progress.is_some())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl RunContext {
    /// Creates a context with seed 0, no progress callback and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Builder method to set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder method to set a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Seed for the run's random choices.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Forwards a progress snapshot to the callback, if any.
    pub fn report(&self, progress: &Progress) {
        if let Some(ref callback) = self.progress {
            callback(progress);
        }
    }
}
