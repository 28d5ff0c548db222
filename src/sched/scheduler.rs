// src/sched/scheduler.rs

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedError};

use super::partition::balanced_partition;
use super::traits::{BatchPadding, ReaderMeta, ResetOutcome, WorkerPipeline};

/// Round `value` up to the nearest multiple of `multiple` (toward positive
/// infinity, so negative values round toward zero).
fn round_up_to_multiple(value: i64, multiple: i64) -> i64 {
    (value + multiple - 1).div_euclid(multiple) * multiple
}

/// Epoch and shard bookkeeping for a group of parallel worker replicas.
///
/// The scheduler owns one worker pipeline per replica and decides, for every
/// iteration step, whether the current epoch has ended, how many trailing
/// slots of the epoch's final batch are padding rather than real data, and how
/// shard assignments rotate between epochs so that every worker eventually
/// observes every shard. It does not produce or transform data itself.
///
/// The driving loop is expected to call, in order per step:
/// [`should_stop`](Self::should_stop), then draw a batch from the workers,
/// then [`advance_step`](Self::advance_step), then
/// [`padding_for_batch`](Self::padding_for_batch). At an epoch boundary the
/// caller invokes [`reset`](Self::reset) (or sets `auto_reset` to have
/// `should_stop` do it).
///
/// # Last-batch policies
///
/// With the dataset `[1,2,3,4,5,6,7]` and batch size 2:
///
/// - `fill_last_batch = false, last_batch_padded = true`: last batch `[7]`,
///   next epoch starts with `[1, 2]`
/// - `fill_last_batch = false, last_batch_padded = false`: last batch `[7]`,
///   next epoch starts with `[2, 3]`
/// - `fill_last_batch = true, last_batch_padded = true`: last batch `[7, 7]`,
///   next epoch starts with `[1, 2]`
/// - `fill_last_batch = true, last_batch_padded = false`: last batch `[7, 1]`,
///   next epoch starts with `[2, 3]`
pub struct ShardScheduler<W: WorkerPipeline> {
    workers: Vec<W>,
    batch_size: i64,
    auto_reset: bool,
    fill_last_batch: bool,
    last_batch_padded: bool,
    stick_to_shard: bool,
    reader_driven: bool,
    /// Total number of logical shards; equals the worker count in manual mode.
    shards_num: i64,
    /// Declared length of the current epoch. Negative means unsized mode.
    effective_size: i64,
    /// Global step counter within the current epoch, in samples per worker.
    counter: i64,
    /// Each worker's current shard, mutated on rotation.
    shard_ids: Vec<usize>,
    /// Balanced partition of the dataset, indexed by shard id. Snapshotted at
    /// construction and never recomputed, only re-indexed as shards rotate.
    shard_sizes_initial: Vec<i64>,
    /// Size of the shard each worker currently holds, indexed by worker slot.
    current_shard_sizes: Vec<i64>,
    /// Per-worker overshoot into the next shard, indexed by worker slot.
    /// Only meaningful in reader-driven fill-without-padding operation.
    counter_per_worker: Vec<i64>,
}

impl<W: WorkerPipeline> ShardScheduler<W> {
    /// Build a scheduler over `workers` with the given sizing policy.
    ///
    /// Builds every worker pipeline in worker-list order and, when
    /// `reader_name` is set, interrogates each worker's reader once to derive
    /// the epoch size, shard geometry, and last-batch policy.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::InvalidConfig`] for illegal option combinations
    /// (empty worker list, zero size, negative size with several workers but
    /// no reader) and [`SchedError::ConfigMismatch`] when workers disagree on
    /// a value that must be uniform (batch size, reader epoch size, shard
    /// count) or on an all-or-none flag (`pad_last_batch`, `stick_to_shard`).
    /// Worker pipeline failures propagate unmodified.
    pub fn new(mut workers: Vec<W>, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        if workers.is_empty() {
            return Err(SchedError::invalid_config(
                "at least one worker pipeline is required",
            ));
        }

        let batch_size = workers[0].batch_size();
        for (slot, worker) in workers.iter().enumerate() {
            if worker.batch_size() != batch_size {
                return Err(SchedError::mismatch(
                    "batch_size",
                    format!(
                        "worker {slot} reports {}, worker 0 reports {batch_size}",
                        worker.batch_size()
                    ),
                ));
            }
        }
        if batch_size == 0 {
            return Err(SchedError::invalid_config("batch_size must not be 0"));
        }

        let reader_driven = config.reader_name.is_some();
        if config.size < 0 && !reader_driven && workers.len() > 1 {
            return Err(SchedError::invalid_config(
                "negative size is supported only with a single worker or reader-driven sizing",
            ));
        }

        let mut auto_reset = config.auto_reset;
        let mut fill_last_batch = config.fill_last_batch;
        let mut last_batch_padded = config.last_batch_padded;
        if config.size < 0 && !reader_driven {
            // unsized mode: the caller alone decides when iteration stops
            if auto_reset || fill_last_batch || last_batch_padded {
                tracing::warn!(
                    "unsized iteration disables auto_reset, fill_last_batch \
                     and last_batch_padded"
                );
            }
            auto_reset = false;
            fill_last_batch = false;
            last_batch_padded = false;
        }
        if config.size > 0 && !reader_driven {
            tracing::warn!(
                "manual size set without reader_name; prefer reader-driven sizing so \
                 the scheduler tracks the actual shard geometry and does not miss or \
                 duplicate samples"
            );
        }

        for worker in &mut workers {
            worker.build()?;
        }

        let batch = batch_size as i64;
        let num_workers = workers.len();

        if let Some(name) = config.reader_name.as_deref() {
            let mut metas: Vec<ReaderMeta> = Vec::with_capacity(num_workers);
            for worker in &workers {
                metas.push(worker.reader_meta(name)?);
            }
            let first = metas[0];
            if first.number_of_shards <= 0 {
                return Err(SchedError::invalid_config(
                    "reader reports no shards",
                ));
            }
            for (slot, meta) in metas.iter().enumerate() {
                if meta.epoch_size != first.epoch_size {
                    return Err(SchedError::mismatch(
                        "reader epoch_size",
                        format!(
                            "worker {slot} reports {}, worker 0 reports {}",
                            meta.epoch_size, first.epoch_size
                        ),
                    ));
                }
                if meta.number_of_shards != first.number_of_shards {
                    return Err(SchedError::mismatch(
                        "reader number_of_shards",
                        format!(
                            "worker {slot} reports {}, worker 0 reports {}",
                            meta.number_of_shards, first.number_of_shards
                        ),
                    ));
                }
                if meta.shard_id as i64 >= first.number_of_shards {
                    return Err(SchedError::invalid_config(format!(
                        "worker {slot} shard_id {} out of range for {} shards",
                        meta.shard_id, first.number_of_shards
                    )));
                }
            }
            let pad_count = metas.iter().filter(|m| m.pad_last_batch).count();
            if pad_count != 0 && pad_count != num_workers {
                return Err(SchedError::mismatch(
                    "reader pad_last_batch",
                    "must be set on all readers or on none",
                ));
            }
            let stick_count = metas.iter().filter(|m| m.stick_to_shard).count();
            if stick_count != 0 && stick_count != num_workers {
                return Err(SchedError::mismatch(
                    "reader stick_to_shard",
                    "must be set on all readers or on none",
                ));
            }

            let size_no_pad = first.epoch_size;
            let shards_num = first.number_of_shards;
            last_batch_padded = first.pad_last_batch;
            let stick_to_shard = first.stick_to_shard;
            let shard_ids: Vec<usize> = metas.iter().map(|m| m.shard_id).collect();

            let effective_size = if last_batch_padded {
                // with padding enabled all shards are equal
                first.epoch_size_padded / shards_num
            } else {
                // smallest multiple of the batch size covering the largest shard
                let per_shard = (size_no_pad + shards_num - 1) / shards_num;
                round_up_to_multiple(per_shard, batch)
            };

            let shard_sizes_initial = balanced_partition(shards_num, size_no_pad);
            let current_shard_sizes = shard_ids
                .iter()
                .map(|&id| shard_sizes_initial[id])
                .collect();

            Ok(Self {
                workers,
                batch_size: batch,
                auto_reset,
                fill_last_batch,
                last_batch_padded,
                stick_to_shard,
                reader_driven,
                shards_num,
                effective_size,
                counter: 0,
                shard_ids,
                shard_sizes_initial,
                current_shard_sizes,
                counter_per_worker: vec![0; num_workers],
            })
        } else {
            // Manual sizing: one shard per worker, balanced over the declared
            // size so padding stays well defined. Unsized mode keeps an empty
            // geometry; it never reports padding or a boundary.
            let shards_num = num_workers as i64;
            let shard_sizes_initial = if config.size > 0 {
                balanced_partition(shards_num, config.size)
            } else {
                vec![0; num_workers]
            };
            let shard_ids: Vec<usize> = (0..num_workers).collect();
            let current_shard_sizes = shard_ids
                .iter()
                .map(|&id| shard_sizes_initial[id])
                .collect();

            Ok(Self {
                workers,
                batch_size: batch,
                auto_reset,
                fill_last_batch,
                last_batch_padded,
                stick_to_shard: false,
                reader_driven,
                shards_num,
                effective_size: config.size,
                counter: 0,
                shard_ids,
                shard_sizes_initial,
                current_shard_sizes,
                counter_per_worker: vec![0; num_workers],
            })
        }
    }

    /// Whether the current epoch's declared length has been consumed.
    ///
    /// Pure boundary detection; never mutates state. In unsized mode the
    /// declared length is negative and this never reports true.
    pub fn epoch_finished(&self) -> bool {
        self.effective_size > 0 && self.counter >= self.effective_size
    }

    /// Check the stop condition for the current step.
    ///
    /// Returns true at the epoch boundary. When `auto_reset` is configured the
    /// boundary also advances the scheduler to the next epoch before
    /// reporting, so the following call starts fresh.
    ///
    /// # Errors
    ///
    /// Propagates worker pipeline failures from the auto-reset.
    pub fn should_stop(&mut self) -> Result<bool> {
        if self.epoch_finished() {
            if self.auto_reset {
                self.reset()?;
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Record that one batch per worker has been drawn.
    ///
    /// Call after every successful batch draw; [`padding_for_batch`]
    /// (Self::padding_for_batch) reports against the advanced counter.
    pub fn advance_step(&mut self) {
        self.counter += self.batch_size;
    }

    /// Report how much of the batch just drawn is real data per worker.
    ///
    /// Only meaningful when `fill_last_batch` is off; a filled last batch has
    /// nothing to mark and yields [`BatchPadding::none`]. The report tells the
    /// caller how many trailing batch slots should be flagged as padding in
    /// the batch metadata; whether to drop them is the caller's decision.
    pub fn padding_for_batch(&self) -> BatchPadding {
        if self.fill_last_batch || self.effective_size < 0 {
            return BatchPadding::none();
        }
        let left: Vec<i64> = self
            .shard_ids
            .iter()
            .map(|&id| self.batch_size - (self.counter - self.shard_sizes_initial[id]))
            .collect();
        let has_padding = left.iter().any(|&l| l < self.batch_size);
        BatchPadding {
            has_padding,
            left_per_worker: Some(left),
        }
    }

    /// Advance the scheduler across the epoch boundary.
    ///
    /// Rebases the step counter according to the last-batch policy, rotates
    /// shard assignments (reader-driven, unless `stick_to_shard`), recomputes
    /// the next epoch's declared length from what each worker still has to
    /// read, and finally resets every worker pipeline, scheduling a fresh
    /// production run on those that report empty.
    ///
    /// Resetting while the epoch is not yet exhausted is ignored and reported
    /// as [`ResetOutcome::Skipped`]; in unsized mode a reset is always
    /// honored.
    ///
    /// # Errors
    ///
    /// Propagates worker pipeline failures unmodified.
    pub fn reset(&mut self) -> Result<ResetOutcome> {
        if !(self.counter >= self.effective_size || self.effective_size < 0) {
            tracing::warn!(
                counter = self.counter,
                epoch_size = self.effective_size,
                "reset requested before the epoch finished; ignoring"
            );
            return Ok(ResetOutcome::Skipped);
        }

        if self.fill_last_batch && !self.last_batch_padded {
            if self.reader_driven {
                // The counter started this epoch at min(counter_per_worker);
                // strip that to get the samples actually read, then track each
                // worker's overshoot past its (unequal) shard. The next epoch
                // starts where the slowest worker left off, so every worker
                // eventually covers its shard fully.
                let start = self.min_counter_per_worker();
                self.counter -= start;
                for (overshoot, &size) in self
                    .counter_per_worker
                    .iter_mut()
                    .zip(&self.current_shard_sizes)
                {
                    *overshoot += self.counter;
                    *overshoot -= size;
                }
                self.counter = self.min_counter_per_worker();
            } else {
                // legacy modulo rebase for manually sized epochs
                self.counter %= self.effective_size;
            }
        } else {
            self.counter = 0;
        }

        if self.reader_driven {
            if !self.stick_to_shard {
                self.rotate_shards();
            }
            if self.fill_last_batch && !self.last_batch_padded {
                // how many samples each worker must reach in its next shard,
                // net of what it already read ahead
                let max_read = self
                    .current_shard_sizes
                    .iter()
                    .zip(&self.counter_per_worker)
                    .map(|(&size, &overshoot)| size - overshoot)
                    .max()
                    .unwrap_or(0);
                self.effective_size = round_up_to_multiple(max_read, self.batch_size);
                if self.effective_size == 0 {
                    // every worker already consumed its next shard while
                    // reading ahead; skip that epoch entirely
                    self.counter_per_worker.fill(0);
                    self.counter = 0;
                    if !self.stick_to_shard {
                        self.rotate_shards();
                    }
                    let max_size = self
                        .current_shard_sizes
                        .iter()
                        .copied()
                        .max()
                        .unwrap_or(0);
                    self.effective_size = round_up_to_multiple(max_size, self.batch_size);
                }
            }
        }

        for worker in &mut self.workers {
            worker.reset()?;
            if worker.empty() {
                worker.schedule_run()?;
            }
        }

        Ok(ResetOutcome::Advanced)
    }

    fn min_counter_per_worker(&self) -> i64 {
        self.counter_per_worker.iter().copied().min().unwrap_or(0)
    }

    /// Move every worker one shard forward, keeping
    /// `current_shard_sizes[w] == shard_sizes_initial[shard_ids[w]]`.
    fn rotate_shards(&mut self) {
        let shards = self.shards_num as usize;
        for id in &mut self.shard_ids {
            *id = (*id + 1) % shards;
        }
        for (slot, &id) in self.shard_ids.iter().enumerate() {
            self.current_shard_sizes[slot] = self.shard_sizes_initial[id];
        }
    }

    /// Declared length of the current epoch; negative in unsized mode.
    pub fn size(&self) -> i64 {
        self.effective_size
    }

    /// Step counter within the current epoch.
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Batch size shared by all workers.
    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    /// Number of worker replicas.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// The shard currently assigned to each worker slot.
    pub fn shard_ids(&self) -> &[usize] {
        &self.shard_ids
    }

    /// Whether the boundary observed by [`should_stop`](Self::should_stop)
    /// advances the epoch automatically.
    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    /// Whether the last batch of an epoch is filled up to the batch size.
    pub fn fill_last_batch(&self) -> bool {
        self.fill_last_batch
    }

    /// Whether a filled last batch repeats the final sample.
    pub fn last_batch_padded(&self) -> bool {
        self.last_batch_padded
    }
}
