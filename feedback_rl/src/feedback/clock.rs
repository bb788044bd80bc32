//! Step position within a run, shared by replication and shaping.

use serde::{Deserialize, Serialize};

/// Where a step sits relative to warmup and the end of training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepClock {
    /// 1-based index of the step being taken.
    pub step: usize,
    /// First step after warmup.
    pub warmup_end: usize,
    /// Configured total number of steps.
    pub total: usize,
}

impl StepClock {
    pub fn new(step: usize, warmup_end: usize, total: usize) -> Self {
        Self {
            step,
            warmup_end,
            total,
        }
    }

    /// Warmup end for a total and a warmup fraction in [0, 1].
    pub fn warmup_end_for(total: usize, warmup_fraction: f64) -> usize {
        let fraction = if warmup_fraction.is_finite() {
            warmup_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (total as f64 * fraction) as usize
    }

    #[inline]
    pub fn in_warmup(&self) -> bool {
        self.step < self.warmup_end
    }

    #[inline]
    pub fn steps_since_warmup(&self) -> usize {
        self.step.saturating_sub(self.warmup_end)
    }

    /// Steps left before `total`, negative once past it.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.total as i64 - self.step as i64
    }

    /// Fraction of training elapsed, `step / total`, clamped to [0, 1].
    pub fn elapsed_fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.step as f64 / self.total as f64).clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_window() {
        let warmup_end = StepClock::warmup_end_for(1000, 0.1);
        assert_eq!(warmup_end, 100);
        assert!(StepClock::new(99, warmup_end, 1000).in_warmup());
        assert!(!StepClock::new(100, warmup_end, 1000).in_warmup());
        assert_eq!(StepClock::new(150, warmup_end, 1000).steps_since_warmup(), 50);
    }

    #[test]
    fn test_warmup_fraction_sanitized() {
        assert_eq!(StepClock::warmup_end_for(100, 2.0), 100);
        assert_eq!(StepClock::warmup_end_for(100, -1.0), 0);
        assert_eq!(StepClock::warmup_end_for(100, f64::NAN), 0);
    }

    #[test]
    fn test_elapsed_fraction() {
        assert_eq!(StepClock::new(0, 0, 10).elapsed_fraction(), 0.0);
        assert_eq!(StepClock::new(5, 0, 10).elapsed_fraction(), 0.5);
        assert_eq!(StepClock::new(20, 0, 10).elapsed_fraction(), 1.0);
        assert_eq!(StepClock::new(0, 0, 0).elapsed_fraction(), 1.0);
    }
}
