//! Replay replication counts.
//!
//! Each step's transition is inserted into replay `count` times. Strong
//! feedback (either sign) starts with several copies and decays as training
//! progresses past warmup; neutral steps are stored once.
//!
//! ```text
//! positive: max(1, floor(4 * (1 - 0.5 * p)))    4 → 2
//! neutral:  1
//! negative: max(1, floor(3 * (1 - 0.3 * p)))    3 → 2
//! ```
//!
//! `p` is progress since warmup, clamped to [0, 1]. Its denominator is
//! selected by [`ProgressClock`].

use serde::{Deserialize, Serialize};

use super::classifier::FeedbackClass;
use super::clock::StepClock;

/// Denominator used for replication progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgressClock {
    /// `steps_since_warmup / max(1, total - step)`.
    #[default]
    RemainingSteps,
    /// `steps_since_warmup / max(1, total - warmup_end)`: linear over the
    /// post-warmup span.
    PostWarmupSpan,
}

/// Replication tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Copies of a positive step at progress 0.
    pub positive_base: u32,
    /// Fractional decay of positive copies at progress 1.
    pub positive_decay: f32,
    /// Copies of a negative step at progress 0.
    pub negative_base: u32,
    /// Fractional decay of negative copies at progress 1.
    pub negative_decay: f32,
    /// Progress denominator.
    pub clock: ProgressClock,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            positive_base: 4,
            positive_decay: 0.5,
            negative_base: 3,
            negative_decay: 0.3,
            clock: ProgressClock::RemainingSteps,
        }
    }
}

impl ReplicationConfig {
    pub fn with_positive(mut self, base: u32, decay: f32) -> Self {
        self.positive_base = base;
        self.positive_decay = decay;
        self
    }

    pub fn with_negative(mut self, base: u32, decay: f32) -> Self {
        self.negative_base = base;
        self.negative_decay = decay;
        self
    }

    pub fn with_clock(mut self, clock: ProgressClock) -> Self {
        self.clock = clock;
        self
    }

    /// Whether decays are finite and within [0, 1].
    pub fn is_valid(&self) -> bool {
        let ok = |d: f32| d.is_finite() && (0.0..=1.0).contains(&d);
        ok(self.positive_decay) && ok(self.negative_decay)
    }
}

/// Outcome of the replication policy for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicationDecision {
    pub feedback: FeedbackClass,
    pub progress: f32,
    pub count: usize,
}

/// Maps feedback and training progress to a replay insertion count.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicationPolicy {
    config: ReplicationConfig,
}

impl ReplicationPolicy {
    pub fn new(config: ReplicationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Progress since warmup in [0, 1], or `None` when no steps remain.
    pub fn progress(&self, clock: &StepClock) -> Option<f32> {
        if clock.remaining() <= 0 {
            return None;
        }
        let denominator = match self.config.clock {
            ProgressClock::RemainingSteps => clock.remaining().max(1) as f64,
            ProgressClock::PostWarmupSpan => {
                (clock.total as i64 - clock.warmup_end as i64).max(1) as f64
            }
        };
        let progress = clock.steps_since_warmup() as f64 / denominator;
        Some(progress.clamp(0.0, 1.0) as f32)
    }

    /// Copies for a class at a given progress. Never less than 1.
    pub fn count(&self, feedback: FeedbackClass, progress: f32) -> usize {
        let p = if progress.is_finite() {
            progress.clamp(0.0, 1.0) as f64
        } else {
            0.0
        };
        let scaled = |base: u32, decay: f32| {
            let copies = (base as f64 * (1.0 - decay as f64 * p)).floor();
            if copies.is_finite() && copies >= 1.0 {
                copies as usize
            } else {
                1
            }
        };
        match feedback {
            FeedbackClass::Positive => scaled(self.config.positive_base, self.config.positive_decay),
            FeedbackClass::Neutral => 1,
            FeedbackClass::Negative => scaled(self.config.negative_base, self.config.negative_decay),
        }
    }

    /// Full decision for a step. Warmup steps are neutral with one copy.
    pub fn decide(&self, feedback: FeedbackClass, clock: &StepClock) -> ReplicationDecision {
        if clock.in_warmup() {
            return ReplicationDecision {
                feedback: FeedbackClass::Neutral,
                progress: 0.0,
                count: 1,
            };
        }
        match self.progress(clock) {
            Some(progress) => ReplicationDecision {
                feedback,
                progress,
                count: self.count(feedback, progress),
            },
            None => ReplicationDecision {
                feedback,
                progress: 1.0,
                count: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: [FeedbackClass; 3] = [
        FeedbackClass::Positive,
        FeedbackClass::Neutral,
        FeedbackClass::Negative,
    ];

    #[test]
    fn test_endpoints() {
        let policy = ReplicationPolicy::default();
        assert_eq!(policy.count(FeedbackClass::Positive, 0.0), 4);
        assert_eq!(policy.count(FeedbackClass::Positive, 1.0), 2);
        assert_eq!(policy.count(FeedbackClass::Negative, 0.0), 3);
        assert_eq!(policy.count(FeedbackClass::Negative, 1.0), 2);
        assert_eq!(policy.count(FeedbackClass::Neutral, 0.0), 1);
        assert_eq!(policy.count(FeedbackClass::Neutral, 1.0), 1);
    }

    #[test]
    fn test_never_below_one() {
        let policy = ReplicationPolicy::new(
            ReplicationConfig::default()
                .with_positive(0, 1.0)
                .with_negative(1, 1.0),
        );
        for class in CLASSES {
            for i in 0..=100 {
                let p = i as f32 / 100.0;
                assert!(policy.count(class, p) >= 1);
            }
            assert!(policy.count(class, f32::NAN) >= 1);
            assert!(policy.count(class, -5.0) >= 1);
            assert!(policy.count(class, 5.0) >= 1);
        }
    }

    #[test]
    fn test_non_increasing_in_progress() {
        let policy = ReplicationPolicy::default();
        for class in [FeedbackClass::Positive, FeedbackClass::Negative] {
            let mut prev = usize::MAX;
            for i in 0..=1000 {
                let c = policy.count(class, i as f32 / 1000.0);
                assert!(c <= prev, "{:?} increased at progress {}", class, i);
                prev = c;
            }
        }
    }

    #[test]
    fn test_no_remaining_steps_returns_one() {
        let policy = ReplicationPolicy::default();
        let clock = StepClock::new(1000, 100, 1000);
        assert_eq!(policy.progress(&clock), None);
        let decision = policy.decide(FeedbackClass::Positive, &clock);
        assert_eq!(decision.count, 1);

        let past_end = StepClock::new(1200, 100, 1000);
        assert_eq!(policy.decide(FeedbackClass::Negative, &past_end).count, 1);
    }

    #[test]
    fn test_warmup_forces_single_neutral_copy() {
        let policy = ReplicationPolicy::default();
        let clock = StepClock::new(10, 100, 1000);
        let decision = policy.decide(FeedbackClass::Positive, &clock);
        assert_eq!(decision.feedback, FeedbackClass::Neutral);
        assert_eq!(decision.count, 1);
    }

    #[test]
    fn test_progress_clocks_differ() {
        let clock = StepClock::new(550, 100, 1000);

        let remaining = ReplicationPolicy::default();
        // 450 / 450
        assert_eq!(remaining.progress(&clock), Some(1.0));

        let span = ReplicationPolicy::new(
            ReplicationConfig::default().with_clock(ProgressClock::PostWarmupSpan),
        );
        // 450 / 900
        assert_eq!(span.progress(&clock), Some(0.5));
        assert_eq!(span.decide(FeedbackClass::Positive, &clock).count, 3);
    }

    #[test]
    fn test_progress_at_warmup_end_is_zero() {
        let policy = ReplicationPolicy::default();
        let clock = StepClock::new(100, 100, 1000);
        assert_eq!(policy.progress(&clock), Some(0.0));
        assert_eq!(policy.decide(FeedbackClass::Positive, &clock).count, 4);
    }
}
