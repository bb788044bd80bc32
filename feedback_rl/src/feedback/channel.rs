//! Feedback acquisition for one training step.
//!
//! Two modes:
//!
//! - **Teacher**: a reference policy is queried synchronously with the
//!   current state; the divergence between its action and ours is classified.
//! - **Rater**: ratings arrive asynchronously through the run's single-slot
//!   mailbox. While the run is RUNNING the loop takes whatever is pending
//!   (latest wins). While PAUSED it waits for the next rating, polling the
//!   mailbox with a short timeout and re-checking the run state every round.

use std::time::Duration;

use crate::control::state::{RunState, SharedControl};
use crate::core::transition::unix_now;

use super::classifier::{FeedbackClass, FeedbackThresholds};
use super::distance::ActionSet;

/// Where a feedback value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackSource {
    Teacher,
    Human,
    Llm,
}

/// Payload of a feedback event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackValue {
    /// Negativity score in [0, 1].
    Score(f32),
    /// Class chosen directly by the rater.
    Class(FeedbackClass),
}

/// One feedback value, consumed at most once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackEvent {
    pub value: FeedbackValue,
    pub source: FeedbackSource,
    pub timestamp: f64,
}

impl FeedbackEvent {
    pub fn score(score: f32, source: FeedbackSource) -> Self {
        Self {
            value: FeedbackValue::Score(score),
            source,
            timestamp: unix_now(),
        }
    }

    pub fn class(class: FeedbackClass, source: FeedbackSource) -> Self {
        Self {
            value: FeedbackValue::Class(class),
            source,
            timestamp: unix_now(),
        }
    }

    /// Classify the event with the given bands.
    pub fn classify(&self, thresholds: &FeedbackThresholds) -> FeedbackClass {
        match self.value {
            FeedbackValue::Score(s) => thresholds.classify(s),
            FeedbackValue::Class(c) => c,
        }
    }

    /// Score, or the class value for direct classes.
    pub fn raw_value(&self) -> f32 {
        match self.value {
            FeedbackValue::Score(s) => s,
            FeedbackValue::Class(c) => c.as_f32(),
        }
    }
}

/// Reference policy used in teacher mode.
pub trait TeacherPolicy: Send {
    /// Reference action for a stacked state.
    fn infer(&mut self, state: &[f32]) -> usize;
}

impl<F> TeacherPolicy for F
where
    F: FnMut(&[f32]) -> usize + Send,
{
    fn infer(&mut self, state: &[f32]) -> usize {
        self(state)
    }
}

/// Feedback observed for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquiredFeedback {
    pub class: FeedbackClass,
    /// Teacher distance or rater score, on the negativity scale.
    pub score: Option<f32>,
    /// Teacher's action in teacher mode.
    pub reference_action: Option<usize>,
    /// Rater event consumed this step.
    pub event: Option<FeedbackEvent>,
}

impl AcquiredFeedback {
    /// No feedback this step.
    pub fn none() -> Self {
        Self {
            class: FeedbackClass::Neutral,
            score: None,
            reference_action: None,
            event: None,
        }
    }
}

enum Source {
    Teacher {
        policy: Box<dyn TeacherPolicy>,
        actions: ActionSet,
    },
    Rater {
        control: SharedControl,
    },
}

/// Per-step feedback source for the training loop.
pub struct FeedbackChannel {
    source: Source,
    thresholds: FeedbackThresholds,
    poll_interval: Duration,
}

impl FeedbackChannel {
    /// Teacher mode.
    pub fn teacher(
        policy: Box<dyn TeacherPolicy>,
        actions: ActionSet,
        thresholds: FeedbackThresholds,
    ) -> Self {
        Self {
            source: Source::Teacher { policy, actions },
            thresholds,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// External-rater mode reading the run's mailbox.
    pub fn rater(control: SharedControl, thresholds: FeedbackThresholds) -> Self {
        Self {
            source: Source::Rater { control },
            thresholds,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Poll interval of the blocking wait.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_rater(&self) -> bool {
        matches!(self.source, Source::Rater { .. })
    }

    pub fn thresholds(&self) -> &FeedbackThresholds {
        &self.thresholds
    }

    /// Acquire feedback for the step that took `action` from `state`.
    ///
    /// In rater mode a PAUSED run blocks here until a rating arrives or the
    /// run leaves PAUSED. A rating received this way resumes the run.
    pub fn acquire(&mut self, state: &[f32], action: usize) -> AcquiredFeedback {
        let thresholds = self.thresholds;
        match &mut self.source {
            Source::Teacher { policy, actions } => {
                let reference = policy.infer(state);
                let distance = actions.distance(action, reference);
                AcquiredFeedback {
                    class: thresholds.classify(distance),
                    score: Some(distance),
                    reference_action: Some(reference),
                    event: None,
                }
            }
            Source::Rater { control } => {
                let event = if control.state() == RunState::Paused {
                    let event = wait_for_rating(control, self.poll_interval);
                    if event.is_some() {
                        resume_after_rating(control);
                    }
                    event
                } else {
                    poll_latest(control)
                };
                match event {
                    Some(e) => AcquiredFeedback {
                        class: e.classify(&thresholds),
                        score: Some(e.raw_value()),
                        reference_action: None,
                        event: Some(e),
                    },
                    None => AcquiredFeedback::none(),
                }
            }
        }
    }

    /// Drop any pending rating (used during warmup).
    pub fn discard_pending(&self) -> bool {
        match &self.source {
            Source::Rater { control } => control.feedback().clear(),
            Source::Teacher { .. } => false,
        }
    }
}

/// Non-blocking poll: the most recent unconsumed rating, if any.
pub fn poll_latest(control: &SharedControl) -> Option<FeedbackEvent> {
    control.feedback().take()
}

/// Resume a PAUSED run once its rating has been received.
///
/// A stop that raced in wins; the run stays STOPPED.
pub fn resume_after_rating(control: &SharedControl) {
    match control.resume() {
        Ok(true) => log::debug!("[Feedback] rating received, run resumed"),
        Ok(false) => {}
        Err(e) => log::debug!("[Feedback] rating received, run not resumed: {}", e),
    }
}

/// Blocking wait used while PAUSED.
///
/// Returns the first rating received, or `None` as soon as the run is no
/// longer PAUSED.
pub fn wait_for_rating(control: &SharedControl, poll_interval: Duration) -> Option<FeedbackEvent> {
    loop {
        if control.state() != RunState::Paused {
            // A rating posted right before the resume still counts.
            return control.feedback().take();
        }
        if let Some(event) = control.feedback().take_timeout(poll_interval) {
            return Some(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::state::training_control;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_teacher_identical_action_positive() {
        let mut channel = FeedbackChannel::teacher(
            Box::new(|_: &[f32]| 2usize),
            ActionSet::driving(),
            FeedbackThresholds::default(),
        );
        let fb = channel.acquire(&[0.0; 4], 2);
        assert_eq!(fb.class, FeedbackClass::Positive);
        assert_eq!(fb.score, Some(0.0));
        assert_eq!(fb.reference_action, Some(2));
    }

    #[test]
    fn test_teacher_divergent_action_negative() {
        // Left vs Right are antiparallel: normalized distance 1.0
        let mut channel = FeedbackChannel::teacher(
            Box::new(|_: &[f32]| 1usize),
            ActionSet::driving(),
            FeedbackThresholds::default(),
        );
        let fb = channel.acquire(&[0.0; 4], 0);
        assert_eq!(fb.class, FeedbackClass::Negative);
        assert_eq!(fb.score, Some(1.0));
    }

    #[test]
    fn test_rater_nonblocking_latest_then_none() {
        let control = training_control();
        let mut channel = FeedbackChannel::rater(Arc::clone(&control), FeedbackThresholds::default());

        control.feedback().publish(FeedbackEvent::score(0.9, FeedbackSource::Human));
        control.feedback().publish(FeedbackEvent::score(0.05, FeedbackSource::Human));

        let fb = channel.acquire(&[], 0);
        assert_eq!(fb.score, Some(0.05));
        assert_eq!(fb.class, FeedbackClass::Positive);

        let fb = channel.acquire(&[], 0);
        assert_eq!(fb, AcquiredFeedback::none());
    }

    #[test]
    fn test_rater_blocking_wait_receives_and_resumes() {
        let control = training_control();
        control.pause().unwrap();
        let mut channel = FeedbackChannel::rater(Arc::clone(&control), FeedbackThresholds::default())
            .with_poll_interval(Duration::from_millis(10));

        let producer = Arc::clone(&control);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.feedback().publish(FeedbackEvent::score(0.8, FeedbackSource::Llm));
        });

        let fb = channel.acquire(&[], 3);
        handle.join().unwrap();

        assert_eq!(fb.class, FeedbackClass::Negative);
        assert_eq!(control.state(), RunState::Running);
    }

    #[test]
    fn test_blocking_wait_released_by_stop() {
        let control = training_control();
        control.pause().unwrap();

        let stopper = Arc::clone(&control);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stopper.stop();
        });

        let poll = Duration::from_millis(10);
        let start = Instant::now();
        let got = wait_for_rating(&control, poll);
        let waited = start.elapsed();
        handle.join().unwrap();

        assert!(got.is_none());
        assert!(waited < Duration::from_millis(30) + poll * 5);
        assert_eq!(control.state(), RunState::Stopped);
    }

    #[test]
    fn test_blocking_wait_released_by_resume() {
        let control = training_control();
        control.pause().unwrap();

        let resumer = Arc::clone(&control);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resumer.resume().unwrap();
        });

        assert!(wait_for_rating(&control, Duration::from_millis(10)).is_none());
        handle.join().unwrap();
    }

    #[test]
    fn test_direct_class_event() {
        let event = FeedbackEvent::class(FeedbackClass::Negative, FeedbackSource::Human);
        assert_eq!(event.classify(&FeedbackThresholds::default()), FeedbackClass::Negative);
        assert_eq!(event.raw_value(), -1.0);
    }

    #[test]
    fn test_discard_pending() {
        let control = training_control();
        let channel = FeedbackChannel::rater(Arc::clone(&control), FeedbackThresholds::default());
        control.feedback().publish(FeedbackEvent::score(0.3, FeedbackSource::Human));
        assert!(channel.discard_pending());
        assert!(!control.feedback().has_pending());
    }

    #[test]
    fn test_resume_after_rating_keeps_stop() {
        let control = training_control();
        control.pause().unwrap();
        resume_after_rating(&control);
        assert_eq!(control.state(), RunState::Running);

        control.stop();
        resume_after_rating(&control);
        assert_eq!(control.state(), RunState::Stopped);
    }
}
