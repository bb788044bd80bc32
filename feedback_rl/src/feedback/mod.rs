//! Feedback pipeline: from a teacher action or a rater comment to a reward
//! adjustment and a replay replication count.
//!
//! ```text
//!  teacher action ──→ ActionSet::distance ─┐
//!                                          ├─→ FeedbackThresholds::classify ─→ class
//!  rater text ──→ FallbackScorer::score ───┘                                     │
//!                                                   ┌────────────────────────────┤
//!                                                   ▼                            ▼
//!                                        ReplicationPolicy::decide     RewardShaper::shape
//!                                             (copies ≥ 1)            (decaying bonus)
//! ```
//!
//! Warmup steps are always neutral with a single copy.

pub mod channel;
pub mod classifier;
pub mod clock;
pub mod distance;
pub mod llm;
pub mod replication;
pub mod shaping;

#[cfg(test)]
mod tests;

pub use channel::{
    AcquiredFeedback, FeedbackChannel, FeedbackEvent, FeedbackSource, FeedbackValue,
    TeacherPolicy, poll_latest, wait_for_rating,
};
pub use classifier::{FeedbackClass, FeedbackThresholds};
pub use clock::StepClock;
pub use distance::{ActionSet, ActionSetError, cosine_distance};
pub use llm::{
    DEFAULT_SCORE, FallbackScorer, LlmScorer, LlmScorerConfig, ScoreError, ScoreProvider,
    parse_score,
};
pub use replication::{ProgressClock, ReplicationConfig, ReplicationDecision, ReplicationPolicy};
pub use shaping::{RewardShaper, ShapedReward};
