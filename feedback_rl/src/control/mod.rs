//! Run control: pause / resume / stop and feedback submission.
//!
//! ```text
//!  Control Thread                                Training Thread
//! ┌───────────────────┐    ┌──────────────────┐   ┌─────────────────────┐
//! │ ControlHandle     │───→│ TrainingControl  │←──│ top of step: state? │
//! │  pause/resume/stop│    │  Mutex<RunState> │   │ pause loop          │
//! │  submit_feedback  │───→│  FeedbackSlot    │←──│ feedback poll/wait  │
//! └───────────────────┘    │  last action     │←──│ publish action label│
//!                          └──────────────────┘   └─────────────────────┘
//! ```

pub mod handle;
pub mod state;

pub use handle::{ControlHandle, ControlPlane, FeedbackInput};
pub use state::{RunState, SharedControl, TrainingControl, training_control};

/// Precondition failure reported to the control plane.
///
/// None of these change the training loop's state.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Feedback submitted while the run is not paused.
    NotPaused(RunState),
    /// The run has already stopped.
    AlreadyStopped,
    /// No run registered under this id.
    UnknownRun(String),
    /// A live run already uses this id.
    DuplicateRun(String),
    /// Score is NaN or infinite.
    InvalidScore(f32),
    /// Text feedback submitted but no scorer is configured.
    ScorerUnavailable,
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::NotPaused(state) => {
                write!(f, "feedback requires a PAUSED run, run is {}", state)
            }
            ControlError::AlreadyStopped => write!(f, "run has already stopped"),
            ControlError::UnknownRun(id) => write!(f, "no run with id '{}'", id),
            ControlError::DuplicateRun(id) => write!(f, "run '{}' is already registered", id),
            ControlError::InvalidScore(s) => write!(f, "invalid feedback score {}", s),
            ControlError::ScorerUnavailable => write!(f, "text feedback requires a scorer"),
        }
    }
}

impl std::error::Error for ControlError {}
