//! Run checkpointing.
//!
//! A run is persisted once during cleanup, and optionally every N episodes.
//! Network weights travel as burn record bytes produced by
//! [`QLearner::snapshot`](crate::learner::QLearner::snapshot); restoring them
//! goes through [`DqnLearner::restore`](crate::learner::DqnLearner::restore).
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedback_rl::checkpoint::{Checkpointer, CheckpointerConfig};
//!
//! let checkpointer = Checkpointer::new(CheckpointerConfig::new("./checkpoints"))?;
//! let record = checkpointer.load("run-42")?;
//! let learner = learner.restore(&record.network)?;
//! ```

pub mod checkpointer;

pub use checkpointer::{
    is_valid_run_id,
    CheckpointError,
    Checkpointer,
    CheckpointerConfig,
    RunCheckpoint,
};
