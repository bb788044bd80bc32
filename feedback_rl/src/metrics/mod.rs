//! Training statistics and logging.
//!
//! ## Statistics
//!
//! - [`EpisodeStats`] / [`EpisodeAccumulator`]: one record per finished episode
//! - [`RunStats`]: run-level histories stored in the checkpoint
//! - [`RunProgress`]: live counters shared with other threads
//!
//! ## Loggers
//!
//! - [`ConsoleLogger`]: fixed-width console table
//! - [`CSVLogger`]: CSV file for analysis
//! - [`MultiLogger`]: combine several loggers

pub mod logger;
pub mod progress;
pub mod stats;

pub use logger::{CSVLogger, ConsoleLogger, MetricsLogger, MultiLogger, TrainingSnapshot};
pub use progress::{run_progress, RunProgress, SharedRunProgress};
pub use stats::{DistanceSummary, EpisodeAccumulator, EpisodeStats, FeedbackCounts, RunStats};
