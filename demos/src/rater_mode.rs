//! Rater-mode demo.
//!
//! A rater thread periodically pauses the run, looks at the last action and
//! posts a rating. The trainer consumes the rating and resumes on its own.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use feedback_rl::{
    training_control, ControlError, ControlHandle, DqnConfig, EpsilonSchedule, FallbackScorer,
    FeedbackInput, FeedbackMode, FeedbackTrainer, LlmScorer, LlmScorerConfig, RunState,
    SharedRunProgress, TrackEnv, TrainerConfig,
};

use crate::common::{make_learner, print_report, with_outputs, EPISODE_STEPS, FRAME_STACK};

const TOTAL_STEPS: usize = 10_000;
const RATE_EVERY: Duration = Duration::from_millis(250);

pub fn run() {
    let dqn = DqnConfig::default();
    let config = TrainerConfig::new("rater-demo")
        .with_mode(FeedbackMode::Rater)
        .with_total_timesteps(TOTAL_STEPS)
        .with_warmup_fraction(0.05)
        .with_frame_stack(FRAME_STACK)
        .with_batch_size(64)
        .with_replay_capacity(10_000)
        .with_target_update(500)
        .with_epsilon(EpsilonSchedule::Staged {
            warmup: 0.05,
            after: 0.08,
        })
        .with_dqn(dqn);
    let warmup_end = config.warmup_end();

    let trainer = match FeedbackTrainer::new(
        config,
        TrackEnv::new(EPISODE_STEPS),
        make_learner(dqn, 1e-3),
        None,
        training_control(),
    ) {
        Ok(trainer) => with_outputs(trainer),
        Err(e) => {
            eprintln!("invalid config: {}", e);
            return;
        }
    };

    let llm = LlmScorerConfig::from_env();
    let use_text = llm.api_key.is_some();
    let mut handle = trainer.handle();
    if use_text {
        handle = handle.with_scorer(Arc::new(FallbackScorer::new(LlmScorer::new(llm))));
    }
    let progress = trainer.progress();

    let rater = thread::spawn(move || rate_until_stopped(handle, progress, warmup_end, use_text));

    let (report, _learner) = trainer.run();
    print_report(&report);

    match rater.join() {
        Ok(posted) => println!("  rater posted {} ratings", posted),
        Err(_) => eprintln!("rater thread panicked"),
    }
}

/// Rate the last action every [`RATE_EVERY`] once warmup is over.
///
/// Ratings posted during warmup are dropped, so the rater waits for the
/// step counter first.
fn rate_until_stopped(
    handle: ControlHandle,
    progress: SharedRunProgress,
    warmup_end: usize,
    use_text: bool,
) -> usize {
    let mut posted = 0;
    while handle.state() != RunState::Stopped {
        thread::sleep(RATE_EVERY);
        if progress.steps() < warmup_end || handle.state() != RunState::Running {
            continue;
        }
        match handle.pause() {
            Ok(true) => {}
            Ok(false) => continue,
            Err(ControlError::AlreadyStopped) => break,
            Err(e) => {
                log::warn!("[Rater] pause failed: {}", e);
                continue;
            }
        }

        let action = handle.last_action().unwrap_or_default();
        let input = if use_text {
            FeedbackInput::Text(describe(&action).to_string())
        } else {
            FeedbackInput::Score(score(&action))
        };
        match handle.submit_feedback(input) {
            Ok(value) => {
                posted += 1;
                log::info!("[Rater] rated {:?} with {:.2}", action, value);
            }
            Err(ControlError::AlreadyStopped) => break,
            Err(e) => {
                log::warn!("[Rater] feedback rejected: {}", e);
                let _ = handle.resume();
            }
        }
    }
    posted
}

/// Negativity score: moving forward is good, braking and idling are not.
fn score(action: &str) -> f32 {
    match action {
        "Accel" => 0.0,
        "Left+Accel" | "Right+Accel" => 0.2,
        "Left" | "Right" => 0.5,
        _ => 0.9,
    }
}

fn describe(action: &str) -> &'static str {
    match action {
        "Accel" => "Great, keep accelerating down the lane.",
        "Left+Accel" | "Right+Accel" => "Fine, steering while keeping speed.",
        "Left" | "Right" => "Okay correction, but you are losing speed.",
        _ => "Bad, the car is stalling or braking for no reason.",
    }
}
