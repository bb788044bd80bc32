//! Configuration for feedback-augmented DQN training.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checkpoint::is_valid_run_id;
use crate::feedback::{FeedbackThresholds, ReplicationConfig, StepClock};
use crate::learner::DqnConfig;
use crate::scheduling::{EpsilonSchedule, LrSchedule};

/// Configuration validation error.
///
/// Returned by [`TrainerConfig::validate`] and by the trainer constructor,
/// always before the first training step.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter must be positive.
    InvalidCount { field: &'static str, value: usize },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// A composite parameter failed its own check.
    InvalidParameter { field: &'static str, reason: String },
    /// Teacher mode was requested without a teacher policy.
    MissingTeacher,
    /// The learner and the environment disagree on the number of actions.
    ActionCountMismatch { learner: usize, env: usize },
    /// The learner input does not match `frame_stack × obs_size`.
    StateDimMismatch { learner: usize, expected: usize },
    InvalidRunId(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::InvalidParameter { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
            ConfigError::MissingTeacher => {
                write!(f, "teacher feedback mode requires a teacher policy")
            }
            ConfigError::ActionCountMismatch { learner, env } => write!(
                f,
                "learner has {} actions but the environment has {}",
                learner, env
            ),
            ConfigError::StateDimMismatch { learner, expected } => write!(
                f,
                "learner expects {} inputs but stacked states have {}",
                learner, expected
            ),
            ConfigError::InvalidRunId(id) => write!(f, "invalid run id: {:?}", id),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where step feedback comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedbackMode {
    /// A reference policy is queried every step.
    #[default]
    Teacher,
    /// Ratings arrive from the control plane (human or LLM-scored text).
    Rater,
}

/// Configuration for [`FeedbackTrainer`](super::FeedbackTrainer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub run_id: String,
    pub mode: FeedbackMode,
    pub total_timesteps: usize,
    /// Fraction of `total_timesteps` during which feedback is ignored.
    pub warmup_fraction: f64,
    pub feedback_weight: f32,
    /// Frames per stacked state.
    pub frame_stack: usize,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Environment steps between hard target updates.
    pub target_update: usize,
    /// Store the next state on truncated steps so the learner bootstraps.
    pub bootstrap_truncated: bool,
    /// Truncate episodes after this many steps.
    pub max_episode_steps: Option<usize>,
    pub poll_interval_ms: u64,
    pub seed: Option<u64>,
    pub epsilon: EpsilonSchedule,
    pub lr: LrSchedule,
    pub dqn: DqnConfig,
    pub thresholds: FeedbackThresholds,
    pub replication: ReplicationConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            run_id: "run".to_string(),
            mode: FeedbackMode::Teacher,
            total_timesteps: 1_000_000,
            warmup_fraction: 0.05,
            feedback_weight: 0.05,
            frame_stack: 4,
            batch_size: 128,
            replay_capacity: 100_000,
            target_update: 1000,
            bootstrap_truncated: false,
            max_episode_steps: None,
            poll_interval_ms: 100,
            seed: Some(42),
            epsilon: EpsilonSchedule::default(),
            lr: LrSchedule::default(),
            dqn: DqnConfig::default(),
            thresholds: FeedbackThresholds::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl TrainerConfig {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// - run id must be a plain path component
    /// - counts (timesteps, frame stack, batch, capacity, target update, poll) must be > 0
    /// - replay capacity must hold at least one batch
    /// - warmup fraction in [0, 1]; feedback weight finite
    /// - nested schedules, thresholds, replication and DQN settings valid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_run_id(&self.run_id) {
            return Err(ConfigError::InvalidRunId(self.run_id.clone()));
        }

        let counts = [
            ("total_timesteps", self.total_timesteps),
            ("frame_stack", self.frame_stack),
            ("batch_size", self.batch_size),
            ("replay_capacity", self.replay_capacity),
            ("target_update", self.target_update),
            ("poll_interval_ms", self.poll_interval_ms as usize),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }
        if self.max_episode_steps == Some(0) {
            return Err(ConfigError::InvalidCount {
                field: "max_episode_steps",
                value: 0,
            });
        }
        if self.replay_capacity < self.batch_size {
            return Err(ConfigError::InvalidParameter {
                field: "replay_capacity",
                reason: format!(
                    "capacity {} cannot hold a batch of {}",
                    self.replay_capacity, self.batch_size
                ),
            });
        }

        if !self.warmup_fraction.is_finite() || !(0.0..=1.0).contains(&self.warmup_fraction) {
            return Err(ConfigError::OutOfRange {
                field: "warmup_fraction",
                value: self.warmup_fraction,
                min: 0.0,
                max: 1.0,
            });
        }
        if !self.feedback_weight.is_finite() {
            return Err(ConfigError::InvalidParameter {
                field: "feedback_weight",
                reason: "must be finite".to_string(),
            });
        }

        let nested = [
            ("epsilon", self.epsilon.is_valid()),
            ("lr", self.lr.is_valid()),
            ("dqn", self.dqn.is_valid()),
            ("thresholds", self.thresholds.is_valid()),
            ("replication", self.replication.is_valid()),
        ];
        for (field, ok) in nested {
            if !ok {
                return Err(ConfigError::InvalidParameter {
                    field,
                    reason: "out of range or non-finite".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// First step at which feedback is used.
    pub fn warmup_end(&self) -> usize {
        StepClock::warmup_end_for(self.total_timesteps, self.warmup_fraction)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn with_mode(mut self, mode: FeedbackMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_total_timesteps(mut self, total: usize) -> Self {
        self.total_timesteps = total;
        self
    }

    pub fn with_warmup_fraction(mut self, fraction: f64) -> Self {
        self.warmup_fraction = fraction;
        self
    }

    pub fn with_feedback_weight(mut self, weight: f32) -> Self {
        self.feedback_weight = weight;
        self
    }

    pub fn with_frame_stack(mut self, frames: usize) -> Self {
        self.frame_stack = frames;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    pub fn with_target_update(mut self, steps: usize) -> Self {
        self.target_update = steps;
        self
    }

    pub fn with_bootstrap_truncated(mut self, bootstrap: bool) -> Self {
        self.bootstrap_truncated = bootstrap;
        self
    }

    pub fn with_max_episode_steps(mut self, steps: Option<usize>) -> Self {
        self.max_episode_steps = steps;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epsilon(mut self, epsilon: EpsilonSchedule) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_lr(mut self, lr: LrSchedule) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_dqn(mut self, dqn: DqnConfig) -> Self {
        self.dqn = dqn;
        self
    }

    pub fn with_thresholds(mut self, thresholds: FeedbackThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_replication(mut self, replication: ReplicationConfig) -> Self {
        self.replication = replication;
        self
    }
}
