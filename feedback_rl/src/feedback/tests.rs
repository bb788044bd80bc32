//! End-to-end behavior of the feedback pipeline.
//!
//! Each test drives distance → class → replication/shaping the same way the
//! training loop does, without a network or environment.

use super::*;
use std::sync::Arc;

use crate::control::state::training_control;

fn one_hot_set(n: usize) -> ActionSet {
    let vectors = (0..n)
        .map(|i| {
            let mut v = vec![0.0; n];
            v[i] = 1.0;
            v
        })
        .collect();
    ActionSet::unlabeled(vectors).unwrap()
}

// ============================================================================
// Matching actions
// ============================================================================

#[test]
fn identical_one_hot_actions_replicate_four_then_two() {
    let set = one_hot_set(5);
    let thresholds = FeedbackThresholds::default();
    let policy = ReplicationPolicy::default();

    let distance = set.normalized(set.vector(3).unwrap(), set.vector(3).unwrap());
    assert_eq!(distance, 0.0);

    let class = thresholds.classify(distance);
    assert_eq!(class, FeedbackClass::Positive);
    assert_eq!(policy.count(class, 0.0), 4);
    assert_eq!(policy.count(class, 1.0), 2);
}

// ============================================================================
// Maximally divergent actions
// ============================================================================

#[test]
fn zero_vs_nonzero_action_replicates_three() {
    let set = ActionSet::driving();
    let thresholds = FeedbackThresholds::default();
    let policy = ReplicationPolicy::default();

    // No-Op against Brake
    let distance = set.distance(6, 3);
    assert_eq!(distance, 1.0);

    let class = thresholds.classify(distance);
    assert_eq!(class, FeedbackClass::Negative);
    assert_eq!(policy.count(class, 0.0), 3);
    for i in 0..=20 {
        let count = policy.count(class, i as f32 / 20.0);
        assert!((1..=3).contains(&count));
    }
}

// ============================================================================
// Warmup gating
// ============================================================================

#[test]
fn warmup_ignores_pending_feedback() {
    let control = training_control();
    let mut channel = FeedbackChannel::rater(Arc::clone(&control), FeedbackThresholds::default());
    let policy = ReplicationPolicy::default();
    let shaper = RewardShaper::new(1.0);

    let total = 1000;
    let warmup_end = StepClock::warmup_end_for(total, 0.1);
    control
        .feedback()
        .publish(FeedbackEvent::score(0.0, FeedbackSource::Human));

    for step in 1..warmup_end {
        let clock = StepClock::new(step, warmup_end, total);
        // The loop discards ratings during warmup instead of consuming them.
        channel.discard_pending();
        let class = FeedbackClass::Positive;
        let shaped = shaper.shape(-0.1, class, &clock);
        let decision = policy.decide(class, &clock);
        assert_eq!(shaped.reward, -0.1);
        assert_eq!(decision.count, 1);
        assert_eq!(decision.feedback, FeedbackClass::Neutral);
    }
    assert_eq!(channel.acquire(&[], 0), AcquiredFeedback::none());
}

// ============================================================================
// Scorer failure
// ============================================================================

#[test]
fn failing_llm_still_yields_valid_class() {
    let scorer = FallbackScorer::new(|_: &str, _: &str| -> Result<f32, ScoreError> {
        Err(ScoreError::Transport("connection reset".to_string()))
    });
    let score = scorer.score("watch out!", "Right+Accel");
    assert_eq!(score, DEFAULT_SCORE);

    let class = FeedbackThresholds::default().classify(score);
    assert!(matches!(class.value(), -1..=1));
    assert_eq!(class, FeedbackClass::Neutral);
}

// ============================================================================
// Full step after warmup
// ============================================================================

#[test]
fn teacher_feedback_flows_into_reward_and_copies() {
    let mut channel = FeedbackChannel::teacher(
        Box::new(|_: &[f32]| 2usize),
        ActionSet::driving(),
        FeedbackThresholds::default(),
    );
    let policy = ReplicationPolicy::default();
    let shaper = RewardShaper::new(0.5);
    let clock = StepClock::new(100, 100, 1000);

    let fb = channel.acquire(&[0.0; 8], 2);
    let shaped = shaper.shape(1.0, fb.class, &clock);
    let decision = policy.decide(fb.class, &clock);

    assert_eq!(fb.class, FeedbackClass::Positive);
    // 0.5 * 1 * (1 - 0.1)
    assert!((shaped.reward - 1.45).abs() < 1e-6);
    assert_eq!(decision.count, 4);
}
