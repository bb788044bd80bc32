//! Events emitted by a training run.

use serde::{Deserialize, Serialize};

use crate::metrics::EpisodeStats;

/// Events sent from the training loop to whoever watches the run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        run_id: String,
        total_timesteps: usize,
    },

    /// An episode ended.
    EpisodeFinished(EpisodeStats),

    /// The target network was refreshed at `step`.
    TargetSynced { step: usize },

    CheckpointSaved { path: String },

    /// Cleanup ran; no more events follow.
    Finished {
        run_id: String,
        reason: FinishReason,
    },
}

/// Reason why a run finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// All timesteps were consumed.
    Completed,

    /// A stop request was observed.
    Stopped,

    /// The loop panicked or hit an unrecoverable error.
    Panicked(String),
}

impl FinishReason {
    /// Status string reported to completion callbacks.
    pub fn status(&self) -> &'static str {
        match self {
            FinishReason::Completed => "COMPLETED",
            FinishReason::Stopped => "STOPPED",
            FinishReason::Panicked(_) => "FAILED",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FinishReason::Panicked(_))
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Panicked(msg) => write!(f, "FAILED ({})", msg),
            other => write!(f, "{}", other.status()),
        }
    }
}
