//! Schedules for the learning rate and the exploration rate.
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedback_rl::scheduling::{EpsilonSchedule, LrSchedule};
//!
//! let eps = EpsilonSchedule::Exponential { start: 1.0, end: 0.05, decay: 50_000.0 };
//! let lr = LrSchedule::CosineAnnealing { base_lr: 1e-4, min_lr: 1e-6, period: 500 }.build();
//!
//! // In training loop:
//! let explore = rng.gen::<f64>() < eps.epsilon(step, in_warmup);
//! learner.set_learning_rate(lr.get_lr(episode));
//! ```

pub mod epsilon;
pub mod lr_scheduler;


pub use epsilon::EpsilonSchedule;
pub use lr_scheduler::{ConstantLR, CosineAnnealing, LRScheduler, LrSchedule};
