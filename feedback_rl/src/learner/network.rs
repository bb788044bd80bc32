//! Q-network contract and a small MLP implementation.
//!
//! The trainer never depends on a concrete topology: anything implementing
//! [`QNetwork`] maps a batch of stacked states to one Q-value per action.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Action-value network: `[batch, state_dim] -> [batch, n_actions]`.
pub trait QNetwork<B: Backend>: Module<B> {
    fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Flat length of one stacked state.
    fn state_dim(&self) -> usize;

    fn n_actions(&self) -> usize;
}

/// Configuration for [`MlpQNetwork`].
#[derive(Debug, Clone)]
pub struct MlpQNetworkConfig {
    pub state_dim: usize,
    pub hidden_dim: usize,
    pub n_actions: usize,
}

impl MlpQNetworkConfig {
    pub fn new(state_dim: usize, n_actions: usize) -> Self {
        Self {
            state_dim,
            hidden_dim: 128,
            n_actions,
        }
    }

    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpQNetwork<B> {
        MlpQNetwork {
            input: LinearConfig::new(self.state_dim, self.hidden_dim).init(device),
            hidden: LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            head: LinearConfig::new(self.hidden_dim, self.n_actions).init(device),
        }
    }
}

/// Two hidden ReLU layers and a linear Q head.
#[derive(Module, Debug)]
pub struct MlpQNetwork<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
    head: Linear<B>,
}

impl<B: Backend> QNetwork<B> for MlpQNetwork<B> {
    fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.input.forward(states));
        let x = relu(self.hidden.forward(x));
        self.head.forward(x)
    }

    fn state_dim(&self) -> usize {
        self.input.weight.dims()[0]
    }

    fn n_actions(&self) -> usize {
        self.head.weight.dims()[1]
    }
}
