//! Environment abstraction for the training loop.
//!
//! One environment instance per run, stepped with a discrete action index.
//! [`TrackEnv`] is a small lane-keeping task used by the demos and tests.

use std::fmt;

use crate::core::EpisodeState;
use crate::feedback::ActionSet;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    InvalidAction { action: usize, n_actions: usize },
    /// `step` was called before `reset` or after `close`.
    NotReady,
    Backend(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::InvalidAction { action, n_actions } => {
                write!(f, "action {} out of range for {} actions", action, n_actions)
            }
            EnvError::NotReady => write!(f, "environment is not ready (reset first)"),
            EnvError::Backend(msg) => write!(f, "environment backend error: {}", msg),
        }
    }
}

impl std::error::Error for EnvError {}

// ============================================================================
// Step result
// ============================================================================

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Episode ended in an absorbing state.
    pub terminated: bool,
    /// Episode was cut by a time limit.
    pub truncated: bool,
}

impl StepResult {
    pub fn new(observation: Vec<f32>, reward: f32, terminated: bool, truncated: bool) -> Self {
        Self {
            observation,
            reward,
            terminated,
            truncated,
        }
    }

    pub fn episode_state(&self) -> EpisodeState {
        EpisodeState::from_flags(self.terminated, self.truncated)
    }
}

// ============================================================================
// Environment trait
// ============================================================================

/// Single discrete-action environment.
pub trait Environment: Send {
    /// Length of one raw observation (before frame stacking).
    fn obs_size(&self) -> usize;

    /// Action vectors and labels, indexed by action.
    fn action_set(&self) -> &ActionSet;

    fn n_actions(&self) -> usize {
        self.action_set().len()
    }

    /// Start a new episode and return the first observation.
    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, EnvError>;

    fn step(&mut self, action: usize) -> Result<StepResult, EnvError>;

    /// Release resources. Called once during run cleanup.
    fn close(&mut self) -> Result<(), EnvError> {
        Ok(())
    }
}

// ============================================================================
// TrackEnv
// ============================================================================

/// Lane keeping on a straight road.
///
/// Observation: `[lateral_offset, speed, drift]`. Actions are the driving set
/// `(steer, gas, brake)`. Reward is `speed · (1 - |offset|)`; leaving the lane
/// (`|offset| > 1`) terminates with reward −1, and the episode is truncated
/// after `max_steps`.
#[derive(Debug, Clone)]
pub struct TrackEnv {
    actions: ActionSet,
    max_steps: usize,
    offset: f32,
    speed: f32,
    drift: f32,
    steps: usize,
    ready: bool,
    rng: fastrand::Rng,
}

impl TrackEnv {
    pub const OBS_SIZE: usize = 3;

    pub fn new(max_steps: usize) -> Self {
        Self {
            actions: ActionSet::driving(),
            max_steps: max_steps.max(1),
            offset: 0.0,
            speed: 0.0,
            drift: 0.0,
            steps: 0,
            ready: false,
            rng: fastrand::Rng::with_seed(0),
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn observation(&self) -> Vec<f32> {
        vec![self.offset, self.speed, self.drift]
    }
}

impl Environment for TrackEnv {
    fn obs_size(&self) -> usize {
        Self::OBS_SIZE
    }

    fn action_set(&self) -> &ActionSet {
        &self.actions
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, EnvError> {
        if let Some(seed) = seed {
            self.rng = fastrand::Rng::with_seed(seed);
        }
        self.offset = (self.rng.f32() - 0.5) * 0.2;
        self.speed = 0.0;
        self.drift = (self.rng.f32() - 0.5) * 0.04;
        self.steps = 0;
        self.ready = true;
        Ok(self.observation())
    }

    fn step(&mut self, action: usize) -> Result<StepResult, EnvError> {
        if !self.ready {
            return Err(EnvError::NotReady);
        }
        let n_actions = self.actions.len();
        let control = self
            .actions
            .vector(action)
            .ok_or(EnvError::InvalidAction { action, n_actions })?;
        let (steer, gas, brake) = (control[0], control[1], control[2]);

        self.speed = (self.speed + 0.1 * gas - 0.2 * brake - 0.01).clamp(0.0, 1.0);
        self.offset += self.drift + 0.05 * steer * (0.5 + self.speed);
        self.steps += 1;

        let terminated = self.offset.abs() > 1.0;
        let truncated = !terminated && self.steps >= self.max_steps;
        let reward = if terminated {
            -1.0
        } else {
            self.speed * (1.0 - self.offset.abs())
        };
        if terminated || truncated {
            self.ready = false;
        }
        Ok(StepResult::new(self.observation(), reward, terminated, truncated))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.ready = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_before_reset_fails() {
        let mut env = TrackEnv::new(10);
        assert_eq!(env.step(0), Err(EnvError::NotReady));
    }

    #[test]
    fn reset_is_deterministic_with_seed() {
        let mut a = TrackEnv::new(10);
        let mut b = TrackEnv::new(10);
        assert_eq!(a.reset(Some(7)).unwrap(), b.reset(Some(7)).unwrap());
        assert_eq!(a.obs_size(), 3);
        assert_eq!(a.n_actions(), 7);
    }

    #[test]
    fn invalid_action_rejected() {
        let mut env = TrackEnv::new(10);
        env.reset(Some(1)).unwrap();
        assert_eq!(
            env.step(7),
            Err(EnvError::InvalidAction { action: 7, n_actions: 7 })
        );
    }

    #[test]
    fn truncates_after_max_steps() {
        let mut env = TrackEnv::new(3);
        env.reset(Some(1)).unwrap();
        let no_op = 6;
        assert!(!env.step(no_op).unwrap().episode_state().is_done());
        assert!(!env.step(no_op).unwrap().episode_state().is_done());
        let last = env.step(no_op).unwrap();
        assert_eq!(last.episode_state(), EpisodeState::Truncated);
        assert_eq!(env.step(no_op), Err(EnvError::NotReady));
    }

    #[test]
    fn leaving_lane_terminates() {
        let mut env = TrackEnv::new(10_000);
        env.reset(Some(3)).unwrap();
        let left_accel = 4;
        let mut result = env.step(left_accel).unwrap();
        while !result.terminated {
            assert!(!result.truncated);
            result = env.step(left_accel).unwrap();
        }
        assert_eq!(result.reward, -1.0);
        assert_eq!(result.episode_state(), EpisodeState::Terminal);
    }
}
