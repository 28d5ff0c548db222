// src/sched/mod.rs

//! Epoch and shard scheduling for parallel worker replicas.
//!
//! This module decides, for a group of worker pipelines consuming one data
//! shard each, when an epoch ends, how much of the final batch is padding,
//! and how shard assignments rotate between epochs. The workers themselves
//! are opaque collaborators behind the [`WorkerPipeline`] trait; the
//! scheduler only does the bookkeeping.
//!
//! # Example
//!
//! ```ignore
//! use shard_sched::{SchedulerConfig, ShardScheduler};
//!
//! let config = SchedulerConfig {
//!     reader_name: Some("train_reader".to_string()),
//!     auto_reset: true,
//!     ..Default::default()
//! };
//! let mut sched = ShardScheduler::new(workers, config)?;
//!
//! loop {
//!     while !sched.should_stop()? {
//!         // draw one batch from every worker, then:
//!         sched.advance_step();
//!         let padding = sched.padding_for_batch();
//!         // mark padding.left_per_worker slots in the batch metadata
//!     }
//!     // auto_reset already advanced the scheduler to the next epoch
//! }
//! ```

mod partition;
mod scheduler;
mod traits;

pub use partition::balanced_partition;
pub use scheduler::ShardScheduler;
pub use traits::{BatchPadding, ReaderMeta, ResetOutcome, WorkerPipeline};
