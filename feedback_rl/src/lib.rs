//! # Feedback RL: DQN Training With Teacher and Rater Feedback
//!
//! A single-environment DQN trainer whose replay memory and rewards are
//! shaped by per-step feedback. Feedback comes either from a reference
//! policy (teacher mode) or from ratings posted through a control plane
//! (rater mode, human or LLM-scored text).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Control thread(s)                 Training thread                │
//! │  ┌──────────────────┐              ┌───────────────────────────┐  │
//! │  │  ControlHandle   │  pause /     │      FeedbackTrainer      │  │
//! │  │  pause / resume  │  resume /    │                           │  │
//! │  │  stop / ratings  │──stop───────►│  FrameStack ─► QLearner   │  │
//! │  │  LLM scoring     │              │      │            ▲       │  │
//! │  └────────┬─────────┘              │      ▼            │       │  │
//! │           │ FeedbackSlot           │  FeedbackChannel  │       │  │
//! │           └───────────────────────►│      │            │       │  │
//! │                                    │      ▼            │       │  │
//! │                                    │  Replication ─► ReplayStore│  │
//! │                                    │  RewardShaper             │  │
//! │                                    └─────────────┬─────────────┘  │
//! │                                                  ▼                │
//! │                          cleanup: checkpoint, env close, notifier │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedback_rl::{FeedbackTrainer, TrainerConfig, TrackEnv, training_control};
//!
//! let config = TrainerConfig::new("demo")
//!     .with_total_timesteps(10_000)
//!     .with_frame_stack(4);
//!
//! let trainer = FeedbackTrainer::new(config, TrackEnv::new(500), learner, Some(teacher), training_control())?;
//! let handle = trainer.handle();
//! let (report, learner) = trainer.run();
//! ```

pub mod core;
pub mod feedback;
pub mod control;
pub mod buffers;
pub mod scheduling;
pub mod learner;
pub mod environment;
pub mod metrics;
pub mod messages;
pub mod checkpoint;
pub mod runners;

// Re-export commonly used types
pub use core::{EpisodeState, FrameStack, TargetSync, Transition};

pub use feedback::{
    ActionSet, FeedbackChannel, FeedbackClass, FeedbackEvent, FeedbackSource,
    FeedbackThresholds, ReplicationConfig, ReplicationPolicy, RewardShaper, StepClock,
    TeacherPolicy,
};
pub use feedback::{FallbackScorer, LlmScorer, LlmScorerConfig, ScoreProvider};

pub use control::{
    training_control, ControlError, ControlHandle, ControlPlane, FeedbackInput, RunState,
    SharedControl, TrainingControl,
};

pub use buffers::{ReplayStore, ReplayStoreConfig};

pub use learner::{
    dqn_optimizer, DqnConfig, DqnLearner, GreedyTeacher, LearnerError, MlpQNetwork,
    MlpQNetworkConfig, NetworkSnapshot, QLearner, QNetwork,
};

pub use environment::{EnvError, Environment, StepResult, TrackEnv};

pub use metrics::{
    run_progress, CSVLogger, ConsoleLogger, EpisodeStats, MetricsLogger, MultiLogger, RunProgress,
    RunStats, SharedRunProgress, TrainingSnapshot,
};

pub use messages::{ChannelNotifier, CompletionNotifier, FinishReason, HttpNotifier, NotifyError, RunEvent};

// Learning rate and exploration scheduling
pub use scheduling::{ConstantLR, CosineAnnealing, EpsilonSchedule, LRScheduler, LrSchedule};

// Run checkpointing
pub use checkpoint::{CheckpointError, Checkpointer, CheckpointerConfig, RunCheckpoint};

pub use runners::{ConfigError, FeedbackMode, FeedbackTrainer, RunReport, TrainerConfig};
