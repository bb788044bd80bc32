//! Shared run state between the training loop and the control plane.
//!
//! ```text
//!            pause()              stop()
//!  RUNNING ─────────→ PAUSED ─────────────→ STOPPED (terminal)
//!     ↑                 │                      ↑
//!     └──── resume() ───┘                      │
//!     └─────────────────── stop() ─────────────┘
//! ```
//!
//! The control plane mutates the state from its own thread. The training
//! loop only reads it, except for resuming itself after a rated feedback
//! arrives while paused. The single-slot feedback mailbox and the label of
//! the action last taken live here as well; nothing else is shared.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::feedback_slot::FeedbackSlot;
use crate::feedback::channel::FeedbackEvent;

use super::ControlError;

/// Lifecycle state of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Running,
    Paused,
    Stopped,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running => write!(f, "RUNNING"),
            RunState::Paused => write!(f, "PAUSED"),
            RunState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// State machine plus the feedback mailbox of one run.
pub struct TrainingControl {
    state: Mutex<RunState>,
    feedback: FeedbackSlot<FeedbackEvent>,
    last_action: Mutex<Option<String>>,
}

impl TrainingControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RunState::Running),
            feedback: FeedbackSlot::new(),
            last_action: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == RunState::Stopped
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunState::Paused
    }

    /// RUNNING → PAUSED. No-op when already paused.
    ///
    /// Returns true if the state changed.
    pub fn pause(&self) -> Result<bool, ControlError> {
        let mut state = self.state.lock();
        match *state {
            RunState::Running => {
                *state = RunState::Paused;
                Ok(true)
            }
            RunState::Paused => Ok(false),
            RunState::Stopped => Err(ControlError::AlreadyStopped),
        }
    }

    /// PAUSED → RUNNING. No-op when already running.
    pub fn resume(&self) -> Result<bool, ControlError> {
        let mut state = self.state.lock();
        match *state {
            RunState::Paused => {
                *state = RunState::Running;
                Ok(true)
            }
            RunState::Running => Ok(false),
            RunState::Stopped => Err(ControlError::AlreadyStopped),
        }
    }

    /// Any state → STOPPED. Idempotent.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        let changed = *state != RunState::Stopped;
        *state = RunState::Stopped;
        changed
    }

    /// Busy-poll while paused. Returns the state that ended the wait
    /// (RUNNING or STOPPED).
    pub fn wait_while_paused(&self, poll_interval: Duration) -> RunState {
        loop {
            let state = self.state();
            if state != RunState::Paused {
                return state;
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// The single-slot feedback mailbox.
    pub fn feedback(&self) -> &FeedbackSlot<FeedbackEvent> {
        &self.feedback
    }

    /// Record the label of the action the loop just took.
    pub fn set_last_action(&self, label: &str) {
        let mut guard = self.last_action.lock();
        match guard.as_mut() {
            Some(current) if current == label => {}
            _ => *guard = Some(label.to_string()),
        }
    }

    /// Label of the most recent action, if any step has run.
    pub fn last_action(&self) -> Option<String> {
        self.last_action.lock().clone()
    }
}

impl Default for TrainingControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared training control.
pub type SharedControl = Arc<TrainingControl>;

/// Create a new shared control in the RUNNING state.
pub fn training_control() -> SharedControl {
    Arc::new(TrainingControl::new())
}
