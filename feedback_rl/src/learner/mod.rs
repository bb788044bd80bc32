//! Q-learning side of the trainer.
//!
//! - [`QLearner`]: what the training loop needs from a value learner
//! - [`DqnLearner`]: online + target network with a Huber TD loss
//! - [`MlpQNetwork`]: default feed-forward Q network
//! - [`GreedyTeacher`]: a frozen learner used as the reference policy
//!
//! ```text
//!   replay batch ──► online Q(s,a) ──┐
//!                                    ├─► Huber(Q, r + γ·max Q_target(s')·(1-done))
//!   next states ──► target Q(s',·) ──┘            │
//!                       ▲                         ▼
//!                       └── hard copy ◄── optimizer step
//! ```

pub mod dqn;
pub mod network;
pub mod teacher;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use crate::core::Transition;

pub use dqn::{dqn_optimizer, DqnConfig, DqnLearner};
pub use network::{MlpQNetwork, MlpQNetworkConfig, QNetwork};
pub use teacher::GreedyTeacher;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum LearnerError {
    EmptyBatch,
    /// A state did not match the network input width.
    StateDim { expected: usize, got: usize },
    ActionOutOfRange { action: usize, n_actions: usize },
    NonFiniteLoss(f32),
    Tensor(String),
    Record(String),
}

impl fmt::Display for LearnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnerError::EmptyBatch => write!(f, "empty training batch"),
            LearnerError::StateDim { expected, got } => {
                write!(f, "state has {} values, network expects {}", got, expected)
            }
            LearnerError::ActionOutOfRange { action, n_actions } => {
                write!(f, "action {} out of range for {} actions", action, n_actions)
            }
            LearnerError::NonFiniteLoss(loss) => write!(f, "non-finite loss: {}", loss),
            LearnerError::Tensor(msg) => write!(f, "tensor read failed: {}", msg),
            LearnerError::Record(msg) => write!(f, "weight record failed: {}", msg),
        }
    }
}

impl std::error::Error for LearnerError {}

// ============================================================================
// Snapshot
// ============================================================================

/// Serialized learner state: both networks, the optimizer and the step count.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    pub student: Vec<u8>,
    pub target: Vec<u8>,
    pub optimizer: Vec<u8>,
    pub train_steps: u64,
}

// ============================================================================
// Learner contract
// ============================================================================

/// Value learner driven by the training loop.
pub trait QLearner {
    fn n_actions(&self) -> usize;

    fn state_dim(&self) -> usize;

    /// Q-values of the online network for one stacked state.
    fn q_values(&self, state: &[f32]) -> Result<Vec<f32>, LearnerError>;

    /// Index of the largest Q-value; the lowest index wins ties.
    fn greedy_action(&self, state: &[f32]) -> Result<usize, LearnerError> {
        let q = self.q_values(state)?;
        Ok(argmax(&q))
    }

    /// One gradient step on a sampled batch. Returns the loss.
    fn optimize(&mut self, batch: &[Arc<Transition>]) -> Result<f32, LearnerError>;

    /// Overwrite the target network with the online weights.
    fn sync_target(&mut self);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);

    fn train_steps(&self) -> u64;

    fn snapshot(&self) -> Result<NetworkSnapshot, LearnerError>;
}

/// First index of the maximum; NaN entries never win.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}
