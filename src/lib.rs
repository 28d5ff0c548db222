// src/lib.rs

//! Shard Scheduler - Epoch/Shard Bookkeeping Core
//!
//! This crate provides the bookkeeping state machine that drives batched
//! iteration over parallel data shards consumed by parallel worker replicas
//! (typically one shard per accelerator device): epoch-boundary detection,
//! last-batch padding accounting, and round-robin shard rotation with
//! per-epoch effective-size recomputation.

pub mod config;
pub mod error;
pub mod sched;

// Re-export commonly used types for convenience
pub use config::SchedulerConfig;
pub use error::{Result, SchedError};
pub use sched::{
    balanced_partition, BatchPadding, ReaderMeta, ResetOutcome, ShardScheduler, WorkerPipeline,
};
