//! Reward shaping with a time-decayed feedback term.
//!
//! ```text
//! shaped = env_reward + w * class * (1 - step / total)
//! ```
//!
//! The decay factor is clamped to [0, 1], so feedback influence fades
//! linearly and is exactly zero from `total` onwards. Warmup steps carry no
//! feedback term at all.

use super::classifier::FeedbackClass;
use super::clock::StepClock;

/// Shaped reward and the class actually applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedReward {
    pub reward: f32,
    /// Feedback term added to the environment reward.
    pub bonus: f32,
    /// Class after warmup gating.
    pub feedback: FeedbackClass,
}

/// Adds a decaying feedback term to environment rewards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardShaper {
    feedback_weight: f32,
}

impl RewardShaper {
    pub fn new(feedback_weight: f32) -> Self {
        Self { feedback_weight }
    }

    pub fn feedback_weight(&self) -> f32 {
        self.feedback_weight
    }

    /// Decay multiplier `1 - step / total`, clamped to [0, 1].
    pub fn decay(clock: &StepClock) -> f32 {
        1.0 - clock.elapsed_fraction()
    }

    /// Shape one step's reward.
    pub fn shape(&self, env_reward: f32, feedback: FeedbackClass, clock: &StepClock) -> ShapedReward {
        if clock.in_warmup() {
            return ShapedReward {
                reward: env_reward,
                bonus: 0.0,
                feedback: FeedbackClass::Neutral,
            };
        }
        let bonus = self.feedback_weight * feedback.as_f32() * Self::decay(clock);
        ShapedReward {
            reward: env_reward + bonus,
            bonus,
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_weight_at_step_zero() {
        let shaper = RewardShaper::new(0.5);
        let clock = StepClock::new(0, 0, 100);
        let shaped = shaper.shape(1.0, FeedbackClass::Positive, &clock);
        assert!((shaped.bonus - 0.5).abs() < 1e-6);
        assert!((shaped.reward - 1.5).abs() < 1e-6);

        let shaped = shaper.shape(1.0, FeedbackClass::Negative, &clock);
        assert!((shaped.reward - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_vanishes_at_total() {
        let shaper = RewardShaper::new(0.5);
        for step in [100, 101, 10_000] {
            let clock = StepClock::new(step, 0, 100);
            let shaped = shaper.shape(-2.0, FeedbackClass::Positive, &clock);
            assert_eq!(shaped.bonus, 0.0);
            assert_eq!(shaped.reward, -2.0);
        }
    }

    #[test]
    fn test_magnitude_non_increasing() {
        let shaper = RewardShaper::new(1.0);
        let mut prev = f32::INFINITY;
        for step in 0..=200 {
            let clock = StepClock::new(step, 0, 200);
            let bonus = shaper.shape(0.0, FeedbackClass::Negative, &clock).bonus.abs();
            assert!(bonus <= prev);
            prev = bonus;
        }
    }

    #[test]
    fn test_warmup_passes_env_reward_through() {
        let shaper = RewardShaper::new(3.0);
        let clock = StepClock::new(5, 10, 100);
        let shaped = shaper.shape(0.7, FeedbackClass::Negative, &clock);
        assert_eq!(shaped.reward, 0.7);
        assert_eq!(shaped.feedback, FeedbackClass::Neutral);
    }

    #[test]
    fn test_neutral_adds_nothing() {
        let shaper = RewardShaper::new(2.0);
        let clock = StepClock::new(50, 0, 100);
        assert_eq!(shaper.shape(1.25, FeedbackClass::Neutral, &clock).reward, 1.25);
    }
}
