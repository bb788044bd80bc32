//! Training orchestration.
//!
//! # Components
//!
//! - [`TrainerConfig`]: every run parameter, validated before the first step
//! - [`TrainingContext`]: step, episode and statistics counters owned by the loop
//! - [`FeedbackTrainer`]: the ε-greedy DQN loop with feedback acquisition,
//!   replay replication, reward shaping, target sync and single-path cleanup
//!
//! # Threading
//!
//! The trainer runs on the calling thread. Control (pause, resume, stop,
//! ratings) arrives through the [`SharedControl`](crate::control::SharedControl)
//! passed at construction, typically from another thread holding a
//! [`ControlHandle`](crate::control::ControlHandle).

pub mod config;
pub mod context;
pub mod trainer;


pub use config::{ConfigError, FeedbackMode, TrainerConfig};
pub use context::TrainingContext;
pub use trainer::{FeedbackTrainer, RunReport, TrainError};
