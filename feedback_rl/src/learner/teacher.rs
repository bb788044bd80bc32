//! Reference policy backed by a trained learner.

use super::QLearner;
use crate::feedback::TeacherPolicy;

/// Greedy policy over a frozen learner, typically restored from a checkpoint.
///
/// Inference failures (wrong state width) fall back to action 0 with a warning.
pub struct GreedyTeacher<L> {
    learner: L,
    failures: u64,
}

impl<L: QLearner> GreedyTeacher<L> {
    pub fn new(learner: L) -> Self {
        Self {
            learner,
            failures: 0,
        }
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Number of inferences that fell back to action 0.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl<L: QLearner + Send> TeacherPolicy for GreedyTeacher<L> {
    fn infer(&mut self, state: &[f32]) -> usize {
        match self.learner.greedy_action(state) {
            Ok(action) => action,
            Err(e) => {
                self.failures += 1;
                log::warn!("[GreedyTeacher] inference failed, using action 0: {}", e);
                0
            }
        }
    }
}
