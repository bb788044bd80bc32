//! Teacher-mode demo.
//!
//! 1. Train a reference network with plain DQN (rater mode, nobody rates).
//! 2. Train a student with the reference's greedy policy as teacher.

use feedback_rl::{
    training_control, DqnConfig, EpsilonSchedule, FeedbackMode, FeedbackTrainer, GreedyTeacher,
    TrackEnv, TrainerConfig,
};

use crate::common::{make_learner, print_report, with_outputs, EPISODE_STEPS, FRAME_STACK};

const REFERENCE_STEPS: usize = 20_000;
const STUDENT_STEPS: usize = 20_000;

pub fn run() {
    let dqn = DqnConfig::default();

    // ========================================================================
    // Reference policy
    // ========================================================================

    let reference_config = TrainerConfig::new("reference")
        .with_mode(FeedbackMode::Rater)
        .with_total_timesteps(REFERENCE_STEPS)
        .with_frame_stack(FRAME_STACK)
        .with_batch_size(64)
        .with_replay_capacity(20_000)
        .with_target_update(500)
        .with_epsilon(EpsilonSchedule::Exponential {
            start: 1.0,
            end: 0.05,
            decay: 5_000.0,
        })
        .with_dqn(dqn);

    let trainer = match FeedbackTrainer::new(
        reference_config,
        TrackEnv::new(EPISODE_STEPS),
        make_learner(dqn, 1e-3),
        None,
        training_control(),
    ) {
        Ok(trainer) => trainer,
        Err(e) => {
            eprintln!("invalid reference config: {}", e);
            return;
        }
    };
    let (report, reference) = trainer.run();
    print_report(&report);
    if report.reason.is_failure() {
        return;
    }

    // ========================================================================
    // Student with teacher feedback
    // ========================================================================

    let student_config = TrainerConfig::new("student")
        .with_mode(FeedbackMode::Teacher)
        .with_total_timesteps(STUDENT_STEPS)
        .with_warmup_fraction(0.05)
        .with_feedback_weight(0.05)
        .with_frame_stack(FRAME_STACK)
        .with_batch_size(64)
        .with_replay_capacity(20_000)
        .with_target_update(500)
        .with_epsilon(EpsilonSchedule::Staged {
            warmup: 0.05,
            after: 0.08,
        })
        .with_dqn(dqn);

    let trainer = match FeedbackTrainer::new(
        student_config,
        TrackEnv::new(EPISODE_STEPS),
        make_learner(dqn, 1e-3),
        Some(Box::new(GreedyTeacher::new(reference))),
        training_control(),
    ) {
        Ok(trainer) => with_outputs(trainer),
        Err(e) => {
            eprintln!("invalid student config: {}", e);
            return;
        }
    };
    let (report, _student) = trainer.run();
    print_report(&report);
}
