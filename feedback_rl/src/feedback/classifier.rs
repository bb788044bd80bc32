//! Ternary feedback classification.
//!
//! Both teacher distances and external ratings are "negativity" scores in
//! [0, 1]: low means the action was good. They share the same inclusive bands:
//!
//! ```text
//! 0.0 ────── 0.1 ──────────── 0.4 ─────────────── 1.0
//!  positive (+1) │  neutral (0)  │    negative (-1)
//! ```

use serde::{Deserialize, Serialize};

/// Feedback class attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeedbackClass {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl FeedbackClass {
    /// Signed value: +1, 0 or -1.
    #[inline]
    pub fn value(self) -> i8 {
        match self {
            FeedbackClass::Positive => 1,
            FeedbackClass::Neutral => 0,
            FeedbackClass::Negative => -1,
        }
    }

    /// Signed value as a float, for reward arithmetic.
    #[inline]
    pub fn as_f32(self) -> f32 {
        self.value() as f32
    }
}

/// Inclusive upper bounds of the positive and neutral bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackThresholds {
    /// Scores at or below this are positive.
    pub positive_max: f32,
    /// Scores at or below this (and above `positive_max`) are neutral.
    pub neutral_max: f32,
}

impl Default for FeedbackThresholds {
    fn default() -> Self {
        Self {
            positive_max: 0.1,
            neutral_max: 0.4,
        }
    }
}

impl FeedbackThresholds {
    /// Create thresholds with explicit bounds.
    pub fn new(positive_max: f32, neutral_max: f32) -> Self {
        Self {
            positive_max,
            neutral_max,
        }
    }

    /// Whether the bounds are finite and ordered.
    pub fn is_valid(&self) -> bool {
        self.positive_max.is_finite()
            && self.neutral_max.is_finite()
            && self.positive_max >= 0.0
            && self.positive_max <= self.neutral_max
    }

    /// Classify a normalized distance or a negativity rating.
    ///
    /// An exact match (0.0) is always positive. NaN falls into the
    /// negative band.
    pub fn classify(&self, score: f32) -> FeedbackClass {
        if score == 0.0 || score <= self.positive_max {
            FeedbackClass::Positive
        } else if score <= self.neutral_max {
            FeedbackClass::Neutral
        } else {
            FeedbackClass::Negative
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        let t = FeedbackThresholds::default();
        assert_eq!(t.classify(0.0), FeedbackClass::Positive);
        assert_eq!(t.classify(0.1), FeedbackClass::Positive);
        assert_eq!(t.classify(0.1001), FeedbackClass::Neutral);
        assert_eq!(t.classify(0.4), FeedbackClass::Neutral);
        assert_eq!(t.classify(0.4001), FeedbackClass::Negative);
        assert_eq!(t.classify(1.0), FeedbackClass::Negative);
    }

    #[test]
    fn test_exact_match_positive_even_with_zero_band() {
        let t = FeedbackThresholds::new(0.0, 0.0);
        assert_eq!(t.classify(0.0), FeedbackClass::Positive);
        assert_eq!(t.classify(0.01), FeedbackClass::Negative);
    }

    #[test]
    fn test_values() {
        assert_eq!(FeedbackClass::Positive.value(), 1);
        assert_eq!(FeedbackClass::Neutral.value(), 0);
        assert_eq!(FeedbackClass::Negative.value(), -1);
        assert_eq!(FeedbackClass::Negative.as_f32(), -1.0);
    }

    #[test]
    fn test_validity() {
        assert!(FeedbackThresholds::default().is_valid());
        assert!(!FeedbackThresholds::new(0.5, 0.4).is_valid());
        assert!(!FeedbackThresholds::new(f32::NAN, 0.4).is_valid());
    }
}
