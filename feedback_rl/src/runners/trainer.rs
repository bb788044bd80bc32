//! Feedback-augmented DQN training loop.
//!
//! # Step sequence
//!
//! ```text
//! ┌─► control checkpoint ── STOPPED ─────────────────────────────┐
//! │        │ PAUSED (teacher mode or warmup): poll until resumed  │
//! │        │   (rater warmup: a rating resumes, then is dropped)  │
//! │        ▼                                                      │
//! │   ε-greedy action ─► publish action label                     │
//! │        ▼                                                      │
//! │   feedback (warmup: discard pending, class 0)                 │
//! │        │ rater + PAUSED: wait for a rating ── STOPPED ───────┤
//! │        ▼                                                      │
//! │   replication count, env step, shaped reward                  │
//! │        ▼                                                      │
//! │   replay push × count ─► optimize ─► target sync              │
//! │        ▼                                                      │
//! └── episode end? reset frame stack, stats, lr schedule          │
//!                                                                 ▼
//!                          cleanup (exactly once): checkpoint, env close, notify
//! ```
//!
//! The loop body runs under `catch_unwind`; a panic or an environment or
//! learner error still reaches the single cleanup path and is reported as
//! [`FinishReason::Panicked`].

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{ConfigError, FeedbackMode, TrainerConfig};
use super::context::TrainingContext;
use crate::buffers::{ReplayStore, ReplayStoreConfig};
use crate::checkpoint::{Checkpointer, RunCheckpoint};
use crate::control::{ControlHandle, RunState, SharedControl};
use crate::core::{FrameStack, TargetSync, Transition};
use crate::environment::{EnvError, Environment};
use crate::feedback::channel::{resume_after_rating, wait_for_rating};
use crate::feedback::{
    AcquiredFeedback, FeedbackChannel, ReplicationPolicy, RewardShaper, TeacherPolicy,
};
use crate::learner::{LearnerError, QLearner};
use crate::messages::{CompletionNotifier, FinishReason, RunEvent};
use crate::metrics::{
    run_progress, DistanceSummary, MetricsLogger, RunStats, SharedRunProgress, TrainingSnapshot,
};
use crate::scheduling::LRScheduler;

// ============================================================================
// Errors and report
// ============================================================================

/// Unrecoverable failure inside the loop body.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainError {
    Env(EnvError),
    Learner(LearnerError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Env(e) => write!(f, "environment: {}", e),
            TrainError::Learner(e) => write!(f, "learner: {}", e),
        }
    }
}

impl std::error::Error for TrainError {}

impl From<EnvError> for TrainError {
    fn from(e: EnvError) -> Self {
        TrainError::Env(e)
    }
}

impl From<LearnerError> for TrainError {
    fn from(e: LearnerError) -> Self {
        TrainError::Learner(e)
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub reason: FinishReason,
    pub steps: usize,
    pub episodes: usize,
    pub train_steps: u64,
    pub replay_len: usize,
    pub stats: RunStats,
    pub distances: Option<DistanceSummary>,
    /// Run directory of the final checkpoint, if one was written.
    pub checkpoint: Option<PathBuf>,
}

// ============================================================================
// Trainer
// ============================================================================

/// Single-environment DQN trainer with teacher or rater feedback.
pub struct FeedbackTrainer<E: Environment, L: QLearner> {
    config: TrainerConfig,
    env: E,
    learner: L,
    channel: FeedbackChannel,
    control: SharedControl,
    replay: ReplayStore,
    frames: FrameStack,
    replication: ReplicationPolicy,
    shaper: RewardShaper,
    lr_schedule: Box<dyn LRScheduler>,
    target_sync: TargetSync,
    rng: StdRng,
    ctx: TrainingContext,
    progress: SharedRunProgress,
    logger: Option<Box<dyn MetricsLogger>>,
    events: Option<Sender<RunEvent>>,
    notifier: Option<Box<dyn CompletionNotifier>>,
    checkpointer: Option<Checkpointer>,
    cleaned_up: bool,
}

impl<E: Environment, L: QLearner> FeedbackTrainer<E, L> {
    /// Validate everything that can be checked before the first step.
    ///
    /// `teacher` is required in [`FeedbackMode::Teacher`] and ignored in
    /// rater mode.
    pub fn new(
        config: TrainerConfig,
        env: E,
        mut learner: L,
        teacher: Option<Box<dyn TeacherPolicy>>,
        control: SharedControl,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let actions = env.action_set().clone();
        if learner.n_actions() != actions.len() {
            return Err(ConfigError::ActionCountMismatch {
                learner: learner.n_actions(),
                env: actions.len(),
            });
        }
        let expected = config.frame_stack * env.obs_size();
        if learner.state_dim() != expected {
            return Err(ConfigError::StateDimMismatch {
                learner: learner.state_dim(),
                expected,
            });
        }

        let channel = match config.mode {
            FeedbackMode::Teacher => {
                let policy = teacher.ok_or(ConfigError::MissingTeacher)?;
                FeedbackChannel::teacher(policy, actions, config.thresholds)
            }
            FeedbackMode::Rater => {
                if teacher.is_some() {
                    log::warn!("[Trainer] rater mode ignores the supplied teacher policy");
                }
                FeedbackChannel::rater(Arc::clone(&control), config.thresholds)
            }
        }
        .with_poll_interval(config.poll_interval());

        let mut replay_config = ReplayStoreConfig::new(config.replay_capacity);
        if let Some(seed) = config.seed {
            replay_config = replay_config.with_seed(seed);
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let lr_schedule = config.lr.build();
        learner.set_learning_rate(lr_schedule.get_lr(0));

        Ok(Self {
            replay: ReplayStore::new(replay_config),
            frames: FrameStack::new(config.frame_stack),
            replication: ReplicationPolicy::new(config.replication),
            shaper: RewardShaper::new(config.feedback_weight),
            target_sync: TargetSync::every(config.target_update),
            ctx: TrainingContext::new(config.warmup_end(), config.total_timesteps),
            progress: run_progress(),
            lr_schedule,
            rng,
            channel,
            control,
            env,
            learner,
            config,
            logger: None,
            events: None,
            notifier: None,
            checkpointer: None,
            cleaned_up: false,
        })
    }

    pub fn with_logger(mut self, logger: impl MetricsLogger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    /// Send episode and sync events to `tx`.
    pub fn with_events(mut self, tx: Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_notifier(mut self, notifier: impl CompletionNotifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Checkpointer) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Control-plane handle for this run.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle::new(self.config.run_id.clone(), Arc::clone(&self.control))
    }

    /// Live counters readable from other threads.
    pub fn progress(&self) -> SharedRunProgress {
        Arc::clone(&self.progress)
    }

    /// Train until `total_timesteps`, a stop request, or a failure.
    ///
    /// Cleanup runs exactly once whichever way the loop ends. The learner is
    /// returned with the report so it can be reused, e.g. as a teacher.
    pub fn run(mut self) -> (RunReport, L) {
        log::info!(
            "[Trainer] run {} starting: {} steps, warmup until step {}, mode {:?}",
            self.config.run_id,
            self.config.total_timesteps,
            self.ctx.warmup_end(),
            self.config.mode
        );
        let outcome = catch_unwind(AssertUnwindSafe(|| self.train_loop()));
        let reason = match outcome {
            Ok(Ok(reason)) => reason,
            Ok(Err(e)) => {
                log::error!("[Trainer] run {} failed: {}", self.config.run_id, e);
                FinishReason::Panicked(e.to_string())
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!("[Trainer] run {} panicked: {}", self.config.run_id, msg);
                FinishReason::Panicked(msg)
            }
        };
        let report = self.cleanup(reason);
        (report, self.learner)
    }

    // ========================================================================
    // Loop
    // ========================================================================

    fn train_loop(&mut self) -> Result<FinishReason, TrainError> {
        self.emit(RunEvent::Started {
            run_id: self.config.run_id.clone(),
            total_timesteps: self.config.total_timesteps,
        });

        let first = self.env.reset(self.config.seed)?;
        let mut state = self.frames.reset(&first);
        let n_actions = self.learner.n_actions();
        let batch_size = self.config.batch_size;

        while !self.ctx.is_finished() {
            let clock = self.ctx.clock();
            let in_warmup = clock.in_warmup();

            if !self.control_checkpoint(in_warmup) {
                return Ok(FinishReason::Stopped);
            }

            // Action selection
            let epsilon = self.config.epsilon.epsilon(clock.step, in_warmup);
            self.ctx.epsilon = epsilon;
            let action = if self.rng.gen::<f64>() < epsilon {
                self.rng.gen_range(0..n_actions)
            } else {
                self.learner.greedy_action(&state)?
            };
            if let Some(label) = self.env.action_set().label(action) {
                self.control.set_last_action(label);
            }

            // Feedback, gated by warmup
            let acquired = if in_warmup {
                self.channel.discard_pending();
                AcquiredFeedback::none()
            } else {
                self.channel.acquire(&state, action)
            };
            if self.control.is_stopped() {
                return Ok(FinishReason::Stopped);
            }
            let decision = self.replication.decide(acquired.class, &clock);

            // Environment
            let result = self.env.step(action)?;
            let mut episode_state = result.episode_state();
            if !episode_state.is_done() {
                if let Some(max) = self.config.max_episode_steps {
                    if self.ctx.episode.steps() + 1 >= max {
                        episode_state = crate::core::EpisodeState::Truncated;
                    }
                }
            }
            let shaped = self.shaper.shape(result.reward, decision.feedback, &clock);
            let next_state = self.frames.push(&result.observation);

            let stored_next = episode_state
                .keeps_next_state(self.config.bootstrap_truncated)
                .then(|| next_state.clone());
            let transition = Transition::new(
                state,
                action,
                stored_next,
                shaped.reward,
                decision.feedback,
            );
            self.replay.push(transition, decision.count);

            self.record_step(&acquired, in_warmup, shaped.reward, result.reward, decision.count);

            // Learning
            if self.replay.can_sample(batch_size) {
                if let Some(batch) = self.replay.sample(batch_size) {
                    match self.learner.optimize(&batch) {
                        Ok(loss) => {
                            self.ctx.episode.record_loss(loss);
                            self.progress.increment_train_steps();
                        }
                        Err(LearnerError::NonFiniteLoss(loss)) => {
                            log::warn!(
                                "[Trainer] skipping update at step {}: non-finite loss {}",
                                self.ctx.steps_done,
                                loss
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            if self.target_sync.is_due(self.ctx.steps_done) {
                self.learner.sync_target();
                log::debug!("[Trainer] target synced at step {}", self.ctx.steps_done);
                self.emit(RunEvent::TargetSynced {
                    step: self.ctx.steps_done,
                });
            }

            if episode_state.is_done() {
                self.finish_episode();
                let obs = self.env.reset(None)?;
                state = self.frames.reset(&obs);
            } else {
                state = next_state;
            }
        }

        Ok(FinishReason::Completed)
    }

    /// Returns false when the run must stop.
    ///
    /// In rater mode after warmup a PAUSED run is not held here: the step
    /// proceeds to the feedback wait, and a rating resumes the run. During
    /// warmup a rating still ends the pause but is not used.
    fn control_checkpoint(&mut self, in_warmup: bool) -> bool {
        let rater = self.channel.is_rater();
        match self.control.state() {
            RunState::Stopped => false,
            RunState::Paused if rater && !in_warmup => true,
            RunState::Paused => {
                log::info!("[Trainer] paused at step {}", self.ctx.steps_done);
                let poll = self.config.poll_interval();
                let state = if rater {
                    if wait_for_rating(&self.control, poll).is_some() {
                        log::debug!(
                            "[Trainer] rating at step {} dropped during warmup",
                            self.ctx.clock().step
                        );
                        resume_after_rating(&self.control);
                    }
                    self.control.state()
                } else {
                    self.control.wait_while_paused(poll)
                };
                if state == RunState::Running {
                    log::info!("[Trainer] resumed at step {}", self.ctx.steps_done);
                }
                state != RunState::Stopped
            }
            RunState::Running => true,
        }
    }

    fn record_step(
        &mut self,
        acquired: &AcquiredFeedback,
        in_warmup: bool,
        shaped_reward: f32,
        env_reward: f32,
        count: usize,
    ) {
        self.ctx.steps_done += 1;
        self.ctx.episode.record_step(shaped_reward, env_reward);
        self.ctx.stats.record_copies(count);
        self.progress.increment_steps();
        self.progress.set_replay_len(self.replay.len());

        if in_warmup {
            return;
        }
        self.ctx.episode.record_feedback(acquired.class);
        self.progress.record_feedback(acquired.class);
        if acquired.event.is_some() {
            self.ctx.episode.record_rating();
        }
        if let (Some(distance), Some(_)) = (acquired.score, acquired.reference_action) {
            self.ctx.episode.record_distance(distance);
            self.ctx.stats.record_distance(distance);
        }
    }

    fn finish_episode(&mut self) {
        self.close_episode();

        self.learner
            .set_learning_rate(self.lr_schedule.get_lr(self.ctx.episodes));

        let due = self
            .checkpointer
            .as_ref()
            .map_or(false, |c| c.should_save(self.ctx.episodes));
        if due {
            if let Some(path) = self.save_checkpoint(None) {
                self.emit(RunEvent::CheckpointSaved {
                    path: path.display().to_string(),
                });
            }
        }
    }

    /// Fold the running episode into the run statistics and report it.
    fn close_episode(&mut self) {
        let stats = self.ctx.finish_episode(self.learner.learning_rate());
        self.progress.record_episode();

        if let Some(logger) = self.logger.as_mut() {
            let snapshot = TrainingSnapshot::from_episode(&stats, &self.ctx.stats, self.replay.len());
            logger.log(&snapshot);
        }
        log::debug!(
            "[Trainer] episode {} done: reward {:.3}, steps {}, feedback +{}/0{}/-{}",
            stats.episode,
            stats.reward,
            stats.steps,
            stats.feedback.positive,
            stats.feedback.neutral,
            stats.feedback.negative
        );
        self.emit(RunEvent::EpisodeFinished(stats));
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    fn cleanup(&mut self, reason: FinishReason) -> RunReport {
        let mut checkpoint = None;
        if !self.cleaned_up {
            self.cleaned_up = true;
            // A run that ends mid-episode still counts the steps it took.
            if self.ctx.episode.steps() > 0 {
                self.close_episode();
            }
            log::info!(
                "[Trainer] run {} finished ({}) after {} steps, {} episodes",
                self.config.run_id,
                reason,
                self.ctx.steps_done,
                self.ctx.episodes
            );

            if let Some(logger) = self.logger.as_mut() {
                logger.flush();
            }

            checkpoint = self.save_checkpoint(Some(reason.clone()));

            let env = &mut self.env;
            match catch_unwind(AssertUnwindSafe(|| env.close())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("[Trainer] environment close failed: {}", e),
                Err(payload) => log::warn!(
                    "[Trainer] environment close panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }

            self.control.stop();

            if let Some(notifier) = self.notifier.as_ref() {
                let run_id = &self.config.run_id;
                match catch_unwind(AssertUnwindSafe(|| notifier.notify(run_id, &reason))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => log::warn!("[Trainer] completion notification failed: {}", e),
                    Err(payload) => log::warn!(
                        "[Trainer] completion notification panicked: {}",
                        panic_message(payload.as_ref())
                    ),
                }
            }
        }

        RunReport {
            run_id: self.config.run_id.clone(),
            reason,
            steps: self.ctx.steps_done,
            episodes: self.ctx.episodes,
            train_steps: self.learner.train_steps(),
            replay_len: self.replay.len(),
            distances: self.ctx.stats.distance_summary(),
            stats: self.ctx.stats.clone(),
            checkpoint,
        }
    }

    /// Persist the run. Failures are logged and swallowed.
    fn save_checkpoint(&mut self, reason: Option<FinishReason>) -> Option<PathBuf> {
        let checkpointer = self.checkpointer.as_mut()?;
        let learner = &self.learner;
        let network = match catch_unwind(AssertUnwindSafe(|| learner.snapshot())) {
            Ok(Ok(network)) => network,
            Ok(Err(e)) => {
                log::warn!("[Trainer] checkpoint skipped, snapshot failed: {}", e);
                return None;
            }
            Err(payload) => {
                log::warn!(
                    "[Trainer] checkpoint skipped, snapshot panicked: {}",
                    panic_message(payload.as_ref())
                );
                return None;
            }
        };
        let mut record = RunCheckpoint::new(
            self.config.run_id.clone(),
            self.config.clone(),
            self.ctx.steps_done,
            self.ctx.episodes,
            self.ctx.stats.clone(),
            network,
        );
        if let Some(reason) = reason {
            record = record.with_finish_reason(reason);
        }
        match checkpointer.save(&record) {
            Ok(path) => {
                log::info!("[Trainer] checkpoint saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("[Trainer] checkpoint save failed: {}", e);
                None
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = self.events.as_ref() {
            if tx.send(event).is_err() {
                log::debug!("[Trainer] event receiver dropped");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
