//! Replay transition type.
//!
//! A `Transition` is created once by the training loop and handed to the
//! replay store, which owns it from then on. The feedback class that shaped
//! its reward travels with it so the learner can optionally re-apply a bonus
//! at replay time.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::feedback::classifier::FeedbackClass;

/// A single environment step as stored for off-policy learning.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Stacked state the action was chosen from.
    pub state: Vec<f32>,
    /// Discrete action index.
    pub action: usize,
    /// Stacked next state, `None` when the episode ended on this step.
    pub next_state: Option<Vec<f32>>,
    /// Shaped reward.
    pub reward: f32,
    /// Wall-clock creation time in seconds since the unix epoch.
    pub timestamp: f64,
    /// Feedback class observed on this step.
    pub feedback: FeedbackClass,
}

impl Transition {
    /// Create a transition stamped with the current time.
    pub fn new(
        state: Vec<f32>,
        action: usize,
        next_state: Option<Vec<f32>>,
        reward: f32,
        feedback: FeedbackClass,
    ) -> Self {
        Self {
            state,
            action,
            next_state,
            reward,
            timestamp: unix_now(),
            feedback,
        }
    }

    /// Whether this transition closes its episode.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.next_state.is_none()
    }
}

/// Seconds since the unix epoch, 0.0 if the clock is before it.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_flag_follows_next_state() {
        let t = Transition::new(vec![0.0; 4], 2, None, -1.0, FeedbackClass::Negative);
        assert!(t.is_terminal());

        let t = Transition::new(vec![0.0; 4], 2, Some(vec![1.0; 4]), 0.5, FeedbackClass::Neutral);
        assert!(!t.is_terminal());
        assert!(t.timestamp > 0.0);
    }
}
