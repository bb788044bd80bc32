//! Learning rate schedules.
//!
//! The trainer steps the learning rate once per episode, so `get_lr` takes
//! an episode index.
//!
//! - `ConstantLR`: fixed learning rate
//! - `CosineAnnealing`: cosine decay from `base_lr` to `min_lr` over `period`
//!
//! # Data Integrity
//!
//! Invalid inputs trigger a panic in debug builds and are sanitized in
//! release builds: non-finite or negative rates become 0.0 and a zero period
//! is treated as 1.

use serde::{Deserialize, Serialize};

/// Learning rate scheduler trait.
pub trait LRScheduler: Send + Sync {
    /// Learning rate for a given episode index.
    fn get_lr(&self, episode: usize) -> f64;
}

fn sanitize_lr(lr: f64) -> f64 {
    if lr.is_finite() && lr >= 0.0 {
        lr
    } else {
        0.0
    }
}

/// Constant learning rate (no scheduling).
#[derive(Debug, Clone, Copy)]
pub struct ConstantLR {
    lr: f64,
}

impl ConstantLR {
    /// # Panics (debug only)
    ///
    /// Panics if `lr` is NaN, Inf, or negative.
    pub fn new(lr: f64) -> Self {
        debug_assert!(lr.is_finite(), "ConstantLR: lr must be finite, got {}", lr);
        debug_assert!(lr >= 0.0, "ConstantLR: lr must be non-negative, got {}", lr);
        Self { lr: sanitize_lr(lr) }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }
}

impl LRScheduler for ConstantLR {
    fn get_lr(&self, _episode: usize) -> f64 {
        self.lr
    }
}

/// Cosine decay, held at `min_lr` after `period` episodes.
///
/// ```text
/// lr(e) = min + (base - min) * (1 + cos(π * min(e, T) / T)) / 2
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CosineAnnealing {
    base_lr: f64,
    min_lr: f64,
    period: usize,
}

impl CosineAnnealing {
    /// # Panics (debug only)
    ///
    /// Panics if a rate is invalid or `period` is 0.
    pub fn new(base_lr: f64, min_lr: f64, period: usize) -> Self {
        debug_assert!(period > 0, "CosineAnnealing: period must be > 0, got {}", period);
        debug_assert!(
            base_lr.is_finite() && base_lr >= 0.0,
            "CosineAnnealing: base_lr must be finite and non-negative, got {}",
            base_lr
        );
        debug_assert!(
            min_lr.is_finite() && min_lr >= 0.0,
            "CosineAnnealing: min_lr must be finite and non-negative, got {}",
            min_lr
        );
        Self {
            base_lr: sanitize_lr(base_lr),
            min_lr: sanitize_lr(min_lr),
            period: period.max(1),
        }
    }

    pub fn base_lr(&self) -> f64 {
        self.base_lr
    }

    pub fn min_lr(&self) -> f64 {
        self.min_lr
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl LRScheduler for CosineAnnealing {
    fn get_lr(&self, episode: usize) -> f64 {
        let progress = episode.min(self.period) as f64 / self.period as f64;
        let cosine = (1.0 + (std::f64::consts::PI * progress).cos()) / 2.0;
        let lr = self.min_lr + (self.base_lr - self.min_lr) * cosine;
        if lr.is_finite() {
            lr.max(0.0)
        } else {
            self.min_lr
        }
    }
}

/// Serializable learning rate schedule choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LrSchedule {
    Constant { lr: f64 },
    CosineAnnealing { base_lr: f64, min_lr: f64, period: usize },
}

impl Default for LrSchedule {
    fn default() -> Self {
        LrSchedule::Constant { lr: 1e-4 }
    }
}

impl LrSchedule {
    /// Learning rate at episode 0.
    pub fn initial_lr(&self) -> f64 {
        match self {
            LrSchedule::Constant { lr } => *lr,
            LrSchedule::CosineAnnealing { base_lr, .. } => *base_lr,
        }
    }

    /// Whether all rates are finite and non-negative and the period is positive.
    pub fn is_valid(&self) -> bool {
        let ok = |lr: f64| lr.is_finite() && lr >= 0.0;
        match *self {
            LrSchedule::Constant { lr } => ok(lr),
            LrSchedule::CosineAnnealing { base_lr, min_lr, period } => {
                ok(base_lr) && ok(min_lr) && period > 0
            }
        }
    }

    /// Build the scheduler.
    pub fn build(&self) -> Box<dyn LRScheduler> {
        match *self {
            LrSchedule::Constant { lr } => Box::new(ConstantLR::new(lr)),
            LrSchedule::CosineAnnealing { base_lr, min_lr, period } => {
                Box::new(CosineAnnealing::new(base_lr, min_lr, period))
            }
        }
    }
}
