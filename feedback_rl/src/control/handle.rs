//! Control-plane entry points.
//!
//! A [`ControlHandle`] is the cloneable, thread-safe face of one run: pause,
//! resume, stop and feedback submission. [`ControlPlane`] maps run ids to
//! handles so a server can route requests by id.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::feedback::channel::{FeedbackEvent, FeedbackSource};
use crate::feedback::classifier::FeedbackClass;
use crate::feedback::llm::FallbackScorer;

use super::state::{RunState, SharedControl};
use super::ControlError;

/// Feedback as submitted by a rater.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackInput {
    /// Free text, scored by the configured scorer.
    Text(String),
    /// Negativity score in [0, 1].
    Score(f32),
    /// Direct class, e.g. from thumbs up / down buttons.
    Class(FeedbackClass),
}

/// Handle to a running training loop.
#[derive(Clone)]
pub struct ControlHandle {
    run_id: String,
    control: SharedControl,
    scorer: Option<Arc<FallbackScorer>>,
}

impl ControlHandle {
    pub fn new(run_id: impl Into<String>, control: SharedControl) -> Self {
        Self {
            run_id: run_id.into(),
            control,
            scorer: None,
        }
    }

    /// Attach a scorer for text feedback.
    pub fn with_scorer(mut self, scorer: Arc<FallbackScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        self.control.state()
    }

    pub fn control(&self) -> &SharedControl {
        &self.control
    }

    /// Label of the action the loop took last.
    pub fn last_action(&self) -> Option<String> {
        self.control.last_action()
    }

    pub fn pause(&self) -> Result<bool, ControlError> {
        let changed = self.control.pause()?;
        if changed {
            log::info!("[Control] run {} paused", self.run_id);
        }
        Ok(changed)
    }

    pub fn resume(&self) -> Result<bool, ControlError> {
        let changed = self.control.resume()?;
        if changed {
            log::info!("[Control] run {} resumed", self.run_id);
        }
        Ok(changed)
    }

    /// Request a stop. Safe to call repeatedly.
    pub fn stop(&self) -> bool {
        let changed = self.control.stop();
        if changed {
            log::info!("[Control] run {} stop requested", self.run_id);
        }
        changed
    }

    /// Submit feedback on the paused step.
    ///
    /// The run must be PAUSED. Text is scored here, on the caller's thread,
    /// so the training loop never waits on the scorer. Returns the score
    /// posted (or the class value for class input).
    pub fn submit_feedback(&self, input: FeedbackInput) -> Result<f32, ControlError> {
        match self.control.state() {
            RunState::Paused => {}
            RunState::Stopped => return Err(ControlError::AlreadyStopped),
            state => return Err(ControlError::NotPaused(state)),
        }

        let event = match input {
            FeedbackInput::Text(text) => {
                let scorer = self.scorer.as_ref().ok_or(ControlError::ScorerUnavailable)?;
                let label = self.control.last_action().unwrap_or_default();
                let score = scorer.score(&text, &label);
                FeedbackEvent::score(score, FeedbackSource::Llm)
            }
            FeedbackInput::Score(score) => {
                FeedbackEvent::score(checked_score(score)?, FeedbackSource::Human)
            }
            FeedbackInput::Class(class) => FeedbackEvent::class(class, FeedbackSource::Human),
        };

        // The loop may have been stopped while the scorer was running.
        if self.control.is_stopped() {
            return Err(ControlError::AlreadyStopped);
        }
        let posted = event.raw_value();
        self.control.feedback().publish(event);
        Ok(posted)
    }

    /// Post a rating without pausing. The loop picks up the latest one
    /// on its next step.
    pub fn post_rating(&self, score: f32) -> Result<(), ControlError> {
        if self.control.is_stopped() {
            return Err(ControlError::AlreadyStopped);
        }
        let score = checked_score(score)?;
        if self
            .control
            .feedback()
            .publish(FeedbackEvent::score(score, FeedbackSource::Human))
        {
            log::debug!("[Control] run {} unconsumed rating replaced", self.run_id);
        }
        Ok(())
    }
}

fn checked_score(score: f32) -> Result<f32, ControlError> {
    if score.is_finite() {
        Ok(score.clamp(0.0, 1.0))
    } else {
        Err(ControlError::InvalidScore(score))
    }
}

/// Registry of runs addressable by id.
#[derive(Default)]
pub struct ControlPlane {
    runs: RwLock<HashMap<String, ControlHandle>>,
}

impl ControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run. Fails if the id is already taken by a live run.
    pub fn register(&self, handle: ControlHandle) -> Result<(), ControlError> {
        let mut runs = self.runs.write();
        if let Some(existing) = runs.get(handle.run_id()) {
            if existing.state() != RunState::Stopped {
                return Err(ControlError::DuplicateRun(handle.run_id().to_string()));
            }
        }
        runs.insert(handle.run_id().to_string(), handle);
        Ok(())
    }

    /// Remove a run, returning its handle.
    pub fn remove(&self, run_id: &str) -> Option<ControlHandle> {
        self.runs.write().remove(run_id)
    }

    pub fn get(&self, run_id: &str) -> Result<ControlHandle, ControlError> {
        self.runs
            .read()
            .get(run_id)
            .cloned()
            .ok_or_else(|| ControlError::UnknownRun(run_id.to_string()))
    }

    pub fn run_ids(&self) -> Vec<String> {
        self.runs.read().keys().cloned().collect()
    }

    pub fn pause(&self, run_id: &str) -> Result<bool, ControlError> {
        self.get(run_id)?.pause()
    }

    pub fn resume(&self, run_id: &str) -> Result<bool, ControlError> {
        self.get(run_id)?.resume()
    }

    pub fn stop(&self, run_id: &str) -> Result<bool, ControlError> {
        Ok(self.get(run_id)?.stop())
    }

    pub fn submit_feedback(&self, run_id: &str, input: FeedbackInput) -> Result<f32, ControlError> {
        self.get(run_id)?.submit_feedback(input)
    }

    pub fn state(&self, run_id: &str) -> Result<RunState, ControlError> {
        Ok(self.get(run_id)?.state())
    }
}
