// src/sched/traits.rs

use crate::error::Result;

/// Reader geometry reported by a worker pipeline.
///
/// Queried once, at scheduler construction, for every worker. The scheduler
/// requires `epoch_size` and `number_of_shards` to be identical across
/// workers, and `pad_last_batch` / `stick_to_shard` to be set either on all
/// workers or on none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderMeta {
    /// Total number of samples in the dataset, without padding.
    pub epoch_size: i64,
    /// Dataset size rounded up so that every shard is the same length.
    pub epoch_size_padded: i64,
    /// Total number of logical shards the dataset is split into.
    pub number_of_shards: i64,
    /// The shard this worker starts the first epoch with.
    pub shard_id: usize,
    /// Whether the reader pads the last batch with the last sample.
    pub pad_last_batch: bool,
    /// Whether the worker keeps the same shard across epochs.
    pub stick_to_shard: bool,
}

/// One parallel worker replica's production pipeline.
///
/// The scheduler treats the pipeline as an opaque, possibly blocking
/// collaborator and calls it strictly in worker-list order. Pipeline failures
/// propagate unmodified; the scheduler never swallows them.
pub trait WorkerPipeline {
    /// Batch size this worker produces. Must be identical across all workers
    /// handed to one scheduler.
    fn batch_size(&self) -> usize;

    /// Prepare the worker for iteration. Idempotent; called once at scheduler
    /// construction.
    fn build(&mut self) -> Result<()>;

    /// Reset the worker's internal production cursor. Called at every epoch
    /// boundary.
    fn reset(&mut self) -> Result<()>;

    /// Whether the worker has no buffered output ready.
    fn empty(&self) -> bool;

    /// Ask the worker to begin producing the next unit of output.
    /// Fire-and-forget.
    fn schedule_run(&mut self) -> Result<()>;

    /// Reader geometry for the named reader. Queried once at construction
    /// when reader-driven sizing is in use.
    fn reader_meta(&self, reader_name: &str) -> Result<ReaderMeta>;
}

/// Per-worker padding report for the batch the counter was just advanced past.
///
/// Only meaningful when `fill_last_batch` is off; with a filled last batch
/// there is nothing to mark and `left_per_worker` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPadding {
    /// Whether any worker's current batch carries padding samples.
    pub has_padding: bool,
    /// For each worker, how many leading slots of the batch hold real data.
    /// A value below the batch size means the trailing
    /// `batch_size - left_per_worker[w]` slots are padding.
    pub left_per_worker: Option<Vec<i64>>,
}

impl BatchPadding {
    /// A report stating no padding applies.
    pub fn none() -> Self {
        Self {
            has_padding: false,
            left_per_worker: None,
        }
    }
}

/// Outcome of a [`reset`](crate::ShardScheduler::reset) request.
///
/// Resetting before the epoch is exhausted is not an error; the request is
/// ignored and reported as [`ResetOutcome::Skipped`] so callers and tests can
/// observe it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The epoch boundary was crossed: counters rebased, shards possibly
    /// rotated, workers reset and primed.
    Advanced,
    /// The epoch was not finished; the request was ignored and no state
    /// changed.
    Skipped,
}
