//! Backend, learner factory and run plumbing shared by the demos.

use burn::backend::{Autodiff, NdArray};
use burn::optim::Optimizer;

use feedback_rl::{
    dqn_optimizer, CheckpointerConfig, Checkpointer, ConsoleLogger, DqnConfig, DqnLearner,
    FeedbackTrainer, HttpNotifier, MlpQNetwork, MlpQNetworkConfig, QLearner, RunReport,
    TrackEnv,
};

// ============================================================================
// Backend Type
// ============================================================================

pub type B = Autodiff<NdArray<f32>>;

pub const FRAME_STACK: usize = 4;
pub const STATE_DIM: usize = FRAME_STACK * TrackEnv::OBS_SIZE;
pub const N_ACTIONS: usize = 7;
pub const EPISODE_STEPS: usize = 500;

pub fn make_learner(
    dqn: DqnConfig,
    lr: f64,
) -> DqnLearner<B, MlpQNetwork<B>, impl Optimizer<MlpQNetwork<B>, B>> {
    let device = Default::default();
    let model = MlpQNetworkConfig::new(STATE_DIM, N_ACTIONS).init::<B>(&device);
    let optimizer = dqn_optimizer::<B, MlpQNetwork<B>>(&dqn);
    DqnLearner::new(model, optimizer, dqn, lr, device)
}

/// Attach console logging, checkpoints and the optional completion callback.
pub fn with_outputs<L: QLearner>(
    trainer: FeedbackTrainer<TrackEnv, L>,
) -> FeedbackTrainer<TrackEnv, L> {
    let mut trainer = trainer.with_logger(ConsoleLogger::new(10));

    match Checkpointer::new(CheckpointerConfig::new("./checkpoints").with_save_every_episodes(50)) {
        Ok(checkpointer) => trainer = trainer.with_checkpointer(checkpointer),
        Err(e) => log::warn!("checkpoints disabled: {}", e),
    }

    match HttpNotifier::from_env() {
        Some(Ok(notifier)) => trainer = trainer.with_notifier(notifier),
        Some(Err(e)) => log::warn!("completion callback disabled: {}", e),
        None => {}
    }
    trainer
}

pub fn print_report(report: &RunReport) {
    println!();
    println!("Run {} finished: {}", report.run_id, report.reason);
    println!(
        "  steps {}  episodes {}  updates {}  replay {}",
        report.steps, report.episodes, report.train_steps, report.replay_len
    );
    println!(
        "  mean reward (last 20): {:.3}",
        report.stats.recent_reward(20)
    );
    println!(
        "  feedback +{} / 0{} / -{}  ratings {}  extra copies {}",
        report.stats.feedback.positive,
        report.stats.feedback.neutral,
        report.stats.feedback.negative,
        report.stats.ratings,
        report.stats.extra_copies
    );
    if let Some(d) = report.distances {
        println!(
            "  teacher distance: mean {:.3} std {:.3} min {:.3} max {:.3} (n={})",
            d.mean, d.std, d.min, d.max, d.count
        );
    }
    if let Some(path) = &report.checkpoint {
        println!("  checkpoint: {}", path.display());
    }
}
