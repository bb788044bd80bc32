//! Exploration rate schedules for ε-greedy action selection.
//!
//! - `Exponential`: `end + (start - end) * exp(-step / decay)`
//! - `Staged`: one rate during warmup, another after
//! - `Constant`

use serde::{Deserialize, Serialize};

/// ε as a function of the global step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EpsilonSchedule {
    Exponential { start: f64, end: f64, decay: f64 },
    Staged { warmup: f64, after: f64 },
    Constant(f64),
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule::Exponential {
            start: 1.0,
            end: 0.05,
            decay: 50_000.0,
        }
    }
}

impl EpsilonSchedule {
    /// Exploration probability at `step`, clamped to [0, 1].
    ///
    /// `in_warmup` only matters for the staged schedule.
    pub fn epsilon(&self, step: usize, in_warmup: bool) -> f64 {
        let eps = match *self {
            EpsilonSchedule::Exponential { start, end, decay } => {
                if decay > 0.0 {
                    end + (start - end) * (-(step as f64) / decay).exp()
                } else {
                    end
                }
            }
            EpsilonSchedule::Staged { warmup, after } => {
                if in_warmup {
                    warmup
                } else {
                    after
                }
            }
            EpsilonSchedule::Constant(eps) => eps,
        };
        if eps.is_finite() {
            eps.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Whether every rate is finite and in [0, 1], and decay is non-negative.
    pub fn is_valid(&self) -> bool {
        let ok = |e: f64| e.is_finite() && (0.0..=1.0).contains(&e);
        match *self {
            EpsilonSchedule::Exponential { start, end, decay } => {
                ok(start) && ok(end) && decay.is_finite() && decay >= 0.0
            }
            EpsilonSchedule::Staged { warmup, after } => ok(warmup) && ok(after),
            EpsilonSchedule::Constant(eps) => ok(eps),
        }
    }
}
