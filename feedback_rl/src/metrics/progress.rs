//! Live run counters readable from other threads.
//!
//! The training loop is the only writer; the control plane and demos read.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::feedback::FeedbackClass;

#[derive(Debug, Default)]
pub struct RunProgress {
    steps: AtomicUsize,
    episodes: AtomicUsize,
    train_steps: AtomicUsize,
    replay_len: AtomicUsize,
    positive: AtomicUsize,
    neutral: AtomicUsize,
    negative: AtomicUsize,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_steps(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_train_steps(&self) {
        self.train_steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episode(&self) {
        self.episodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_replay_len(&self, len: usize) {
        self.replay_len.store(len, Ordering::Relaxed);
    }

    pub fn record_feedback(&self, class: FeedbackClass) {
        let counter = match class {
            FeedbackClass::Positive => &self.positive,
            FeedbackClass::Neutral => &self.neutral,
            FeedbackClass::Negative => &self.negative,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn episodes(&self) -> usize {
        self.episodes.load(Ordering::Relaxed)
    }

    pub fn train_steps(&self) -> usize {
        self.train_steps.load(Ordering::Relaxed)
    }

    pub fn replay_len(&self) -> usize {
        self.replay_len.load(Ordering::Relaxed)
    }

    /// `(positive, neutral, negative)`
    pub fn feedback(&self) -> (usize, usize, usize) {
        (
            self.positive.load(Ordering::Relaxed),
            self.neutral.load(Ordering::Relaxed),
            self.negative.load(Ordering::Relaxed),
        )
    }
}

pub type SharedRunProgress = Arc<RunProgress>;

pub fn run_progress() -> SharedRunProgress {
    Arc::new(RunProgress::new())
}
