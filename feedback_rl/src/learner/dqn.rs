//! DQN learner: online network, hard-copied target network, Huber TD loss.
//!
//! ```text
//! y      = r + replay_feedback_weight·class + γ · max_a' Q_target(s', a') · (1 - done)
//! loss   = Huber_δ(Q_online(s, a) - y)
//! ```
//!
//! `done` is set for every transition without a next state (terminal, or
//! truncated when truncation does not bootstrap).

use std::sync::Arc;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Record, Recorder};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::{LearnerError, NetworkSnapshot, QLearner, QNetwork};
use crate::core::{hard_copy, Transition};

// ============================================================================
// Config
// ============================================================================

/// DQN hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    pub gamma: f32,
    /// Transition point between the quadratic and linear parts of the loss.
    pub huber_delta: f32,
    /// Per-element gradient clip value, `None` to disable.
    pub grad_clip: Option<f32>,
    /// Weight of the stored feedback class added to rewards at replay time.
    pub replay_feedback_weight: f32,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            huber_delta: 1.0,
            grad_clip: Some(1.0),
            replay_feedback_weight: 0.0,
        }
    }
}

impl DqnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_grad_clip(mut self, clip: Option<f32>) -> Self {
        self.grad_clip = clip;
        self
    }

    pub fn with_replay_feedback_weight(mut self, weight: f32) -> Self {
        self.replay_feedback_weight = weight;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.gamma.is_finite()
            && (0.0..=1.0).contains(&self.gamma)
            && self.huber_delta.is_finite()
            && self.huber_delta > 0.0
            && self.grad_clip.map_or(true, |c| c.is_finite() && c > 0.0)
            && self.replay_feedback_weight.is_finite()
    }
}

/// Adam with the configured value clipping.
pub fn dqn_optimizer<B, M>(config: &DqnConfig) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    AdamConfig::new()
        .with_grad_clipping(config.grad_clip.map(GradientClippingConfig::Value))
        .init()
}

// ============================================================================
// Learner
// ============================================================================

pub struct DqnLearner<B, M, O>
where
    B: AutodiffBackend,
    M: QNetwork<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    online: M,
    target: M,
    optimizer: O,
    config: DqnConfig,
    lr: f64,
    train_steps: u64,
    device: B::Device,
    recorder: BinBytesRecorder<FullPrecisionSettings>,
}

impl<B, M, O> DqnLearner<B, M, O>
where
    B: AutodiffBackend,
    M: QNetwork<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    /// The target network starts as a hard copy of `model`.
    pub fn new(model: M, optimizer: O, config: DqnConfig, lr: f64, device: B::Device) -> Self {
        let target = hard_copy::<B, M>(&model);
        Self {
            online: model,
            target,
            optimizer,
            config,
            lr,
            train_steps: 0,
            device,
            recorder: BinBytesRecorder::default(),
        }
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn online(&self) -> &M {
        &self.online
    }

    pub fn target(&self) -> &M {
        &self.target
    }

    /// Load weights, optimizer state and step count from a snapshot.
    pub fn restore(mut self, snapshot: &NetworkSnapshot) -> Result<Self, LearnerError> {
        let online = self.decode::<M::Record>(&snapshot.student)?;
        let target = self.decode::<M::Record>(&snapshot.target)?;
        let optimizer = self.decode::<O::Record>(&snapshot.optimizer)?;
        self.online = self.online.load_record(online);
        self.target = self.target.load_record(target);
        self.optimizer = self.optimizer.load_record(optimizer);
        self.train_steps = snapshot.train_steps;
        Ok(self)
    }

    fn encode<R: Record<B>>(&self, record: R) -> Result<Vec<u8>, LearnerError> {
        Recorder::<B>::record(&self.recorder, record, ())
            .map_err(|e| LearnerError::Record(format!("{:?}", e)))
    }

    fn decode<R: Record<B>>(&self, bytes: &[u8]) -> Result<R, LearnerError> {
        Recorder::<B>::load(&self.recorder, bytes.to_vec(), &self.device)
            .map_err(|e| LearnerError::Record(format!("{:?}", e)))
    }

    fn check_state(&self, state: &[f32]) -> Result<(), LearnerError> {
        let expected = self.online.state_dim();
        if state.len() != expected {
            return Err(LearnerError::StateDim {
                expected,
                got: state.len(),
            });
        }
        Ok(())
    }
}

impl<B, M, O> QLearner for DqnLearner<B, M, O>
where
    B: AutodiffBackend,
    M: QNetwork<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn n_actions(&self) -> usize {
        self.online.n_actions()
    }

    fn state_dim(&self) -> usize {
        self.online.state_dim()
    }

    fn q_values(&self, state: &[f32]) -> Result<Vec<f32>, LearnerError> {
        self.check_state(state)?;
        let input = Tensor::<B, 1>::from_floats(state, &self.device).reshape([1, state.len()]);
        let q = self.online.forward(input).detach();
        q.into_data()
            .to_vec::<f32>()
            .map_err(|e| LearnerError::Tensor(format!("{:?}", e)))
    }

    fn optimize(&mut self, batch: &[Arc<Transition>]) -> Result<f32, LearnerError> {
        if batch.is_empty() {
            return Err(LearnerError::EmptyBatch);
        }
        let batch_size = batch.len();
        let state_dim = self.online.state_dim();
        let n_actions = self.online.n_actions();

        let mut states = Vec::with_capacity(batch_size * state_dim);
        let mut next_states = Vec::with_capacity(batch_size * state_dim);
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut not_done = Vec::with_capacity(batch_size);

        for t in batch {
            self.check_state(&t.state)?;
            if t.action >= n_actions {
                return Err(LearnerError::ActionOutOfRange {
                    action: t.action,
                    n_actions,
                });
            }
            states.extend_from_slice(&t.state);
            match &t.next_state {
                Some(next) => {
                    self.check_state(next)?;
                    next_states.extend_from_slice(next);
                    not_done.push(1.0f32);
                }
                None => {
                    next_states.extend(std::iter::repeat(0.0f32).take(state_dim));
                    not_done.push(0.0);
                }
            }
            actions.push(t.action as i32);
            rewards.push(t.reward + self.config.replay_feedback_weight * t.feedback.as_f32());
        }

        let device = &self.device;
        let states_t =
            Tensor::<B, 1>::from_floats(states.as_slice(), device).reshape([batch_size, state_dim]);
        let next_t = Tensor::<B, 1>::from_floats(next_states.as_slice(), device)
            .reshape([batch_size, state_dim]);
        let actions_t =
            Tensor::<B, 1, Int>::from_ints(actions.as_slice(), device).reshape([batch_size, 1]);
        let rewards_t = Tensor::<B, 1>::from_floats(rewards.as_slice(), device);
        let not_done_t = Tensor::<B, 1>::from_floats(not_done.as_slice(), device);

        let q_pred: Tensor<B, 1> = self.online.forward(states_t).gather(1, actions_t).flatten(0, 1);

        let next_max: Tensor<B, 1> = self.target.forward(next_t).detach().max_dim(1).flatten(0, 1);
        let targets = (rewards_t + next_max.mul(not_done_t).mul_scalar(self.config.gamma)).detach();

        let loss = huber_loss(q_pred, targets, self.config.huber_delta);
        let loss_val = tensor_to_scalar(&loss)?;
        if !loss_val.is_finite() {
            return Err(LearnerError::NonFiniteLoss(loss_val));
        }

        let grads = GradientsParams::from_grads(loss.backward(), &self.online);
        self.online = self.optimizer.step(self.lr, self.online.clone(), grads);
        self.train_steps += 1;
        Ok(loss_val)
    }

    fn sync_target(&mut self) {
        self.target = hard_copy::<B, M>(&self.online);
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        if lr.is_finite() && lr >= 0.0 {
            self.lr = lr;
        } else {
            log::warn!("[DqnLearner] ignoring invalid learning rate {}", lr);
        }
    }

    fn train_steps(&self) -> u64 {
        self.train_steps
    }

    fn snapshot(&self) -> Result<NetworkSnapshot, LearnerError> {
        Ok(NetworkSnapshot {
            student: self.encode(self.online.clone().into_record())?,
            target: self.encode(self.target.clone().into_record())?,
            optimizer: self.encode(self.optimizer.to_record())?,
            train_steps: self.train_steps,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Mean Huber loss: `0.5·d²` for `|d| ≤ δ`, `δ·(|d| - 0.5·δ)` beyond.
pub fn huber_loss<B: AutodiffBackend>(
    pred: Tensor<B, 1>,
    target: Tensor<B, 1>,
    delta: f32,
) -> Tensor<B, 1> {
    let abs = (pred - target).abs();
    let quadratic = abs.clone().clamp_max(delta);
    let linear = abs - quadratic.clone();
    (quadratic.powf_scalar(2.0).mul_scalar(0.5) + linear.mul_scalar(delta)).mean()
}

fn tensor_to_scalar<B: AutodiffBackend>(tensor: &Tensor<B, 1>) -> Result<f32, LearnerError> {
    let data = tensor.clone().into_data();
    data.as_slice::<f32>()
        .map_err(|e| LearnerError::Tensor(format!("{:?}", e)))?
        .first()
        .copied()
        .ok_or_else(|| LearnerError::Tensor("empty loss tensor".to_string()))
}
