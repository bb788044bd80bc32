//! Target network synchronization.
//!
//! DQN bootstraps its TD target from a frozen copy of the online network:
//! ```text
//! target = r + γ * max_a Q_target(s', a)
//! ```
//! The copy is refreshed with a hard update every `update_freq` environment
//! steps.

use burn::module::Module;
use burn::tensor::backend::Backend;

/// Perform a hard copy of model weights.
pub fn hard_copy<B, M>(online: &M) -> M
where
    B: Backend,
    M: Module<B> + Clone,
{
    online.clone()
}

/// Decides when the target network is due for a hard update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSync {
    update_freq: usize,
}

impl TargetSync {
    /// Sync every `update_freq` steps. A frequency of 0 is treated as 1.
    pub fn every(update_freq: usize) -> Self {
        Self {
            update_freq: update_freq.max(1),
        }
    }

    /// Returns true when `step` is a positive multiple of the frequency.
    pub fn is_due(&self, step: usize) -> bool {
        step > 0 && step % self.update_freq == 0
    }

    /// Steps between syncs.
    pub fn update_freq(&self) -> usize {
        self.update_freq
    }
}
