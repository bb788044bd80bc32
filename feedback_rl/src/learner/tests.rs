//! Learner tests on the NdArray backend.

use super::*;
use crate::feedback::{FeedbackClass, TeacherPolicy};
use burn::backend::{Autodiff, NdArray};
use burn::optim::Optimizer;
use burn::tensor::Tensor;

type TB = Autodiff<NdArray<f32>>;

const STATE_DIM: usize = 4;
const N_ACTIONS: usize = 3;

fn make_learner(
    config: DqnConfig,
    lr: f64,
) -> DqnLearner<TB, MlpQNetwork<TB>, impl Optimizer<MlpQNetwork<TB>, TB>> {
    let device = Default::default();
    let model = MlpQNetworkConfig::new(STATE_DIM, N_ACTIONS)
        .with_hidden_dim(16)
        .init::<TB>(&device);
    let optimizer = dqn_optimizer::<TB, MlpQNetwork<TB>>(&config);
    DqnLearner::new(model, optimizer, config, lr, device)
}

fn terminal(state: [f32; STATE_DIM], action: usize, reward: f32) -> Arc<Transition> {
    Arc::new(Transition::new(
        state.to_vec(),
        action,
        None,
        reward,
        FeedbackClass::Neutral,
    ))
}

fn forward_vec<M: QNetwork<TB>>(model: &M, state: &[f32]) -> Vec<f32> {
    let device = Default::default();
    let input = Tensor::<TB, 1>::from_floats(state, &device).reshape([1, state.len()]);
    model.forward(input).into_data().to_vec::<f32>().unwrap()
}

// ============================================================================
// Network
// ============================================================================

mod network_tests {
    use super::*;

    #[test]
    fn reports_dimensions() {
        let learner = make_learner(DqnConfig::default(), 1e-3);
        assert_eq!(learner.state_dim(), STATE_DIM);
        assert_eq!(learner.n_actions(), N_ACTIONS);
        let q = learner.q_values(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(q.len(), N_ACTIONS);
        assert!(q.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_wrong_state_width() {
        let learner = make_learner(DqnConfig::default(), 1e-3);
        assert_eq!(
            learner.q_values(&[0.0; 3]),
            Err(LearnerError::StateDim { expected: STATE_DIM, got: 3 })
        );
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[f32::NAN, 0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}

// ============================================================================
// Optimization
// ============================================================================

mod optimize_tests {
    use super::*;

    #[test]
    fn huber_is_quadratic_then_linear() {
        let device = Default::default();
        let pred = Tensor::<TB, 1>::from_floats([0.5, 3.0], &device);
        let target = Tensor::<TB, 1>::from_floats([0.0, 0.0], &device);
        let loss = dqn::huber_loss(pred, target, 1.0);
        let value = loss.into_data().to_vec::<f32>().unwrap()[0];
        // (0.125 + 2.5) / 2
        assert!((value - 1.3125).abs() < 1e-6, "got {}", value);
    }

    #[test]
    fn loss_decreases_on_fixed_batch() {
        let mut learner = make_learner(DqnConfig::default(), 1e-2);
        let batch = vec![
            terminal([1.0, 0.0, 0.0, 0.0], 0, 1.0),
            terminal([0.0, 1.0, 0.0, 0.0], 2, -1.0),
        ];
        let first = learner.optimize(&batch).unwrap();
        let mut last = first;
        for _ in 0..150 {
            last = learner.optimize(&batch).unwrap();
        }
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
        assert_eq!(learner.train_steps(), 151);
    }

    #[test]
    fn empty_batch_is_an_error() {
        let mut learner = make_learner(DqnConfig::default(), 1e-3);
        assert_eq!(learner.optimize(&[]), Err(LearnerError::EmptyBatch));
        assert_eq!(learner.train_steps(), 0);
    }

    #[test]
    fn out_of_range_action_is_an_error() {
        let mut learner = make_learner(DqnConfig::default(), 1e-3);
        let batch = vec![terminal([0.0; STATE_DIM], N_ACTIONS, 0.0)];
        assert_eq!(
            learner.optimize(&batch),
            Err(LearnerError::ActionOutOfRange { action: N_ACTIONS, n_actions: N_ACTIONS })
        );
    }

    #[test]
    fn ignores_invalid_learning_rate() {
        let mut learner = make_learner(DqnConfig::default(), 1e-3);
        learner.set_learning_rate(5e-4);
        assert_eq!(learner.learning_rate(), 5e-4);
        learner.set_learning_rate(f64::NAN);
        assert_eq!(learner.learning_rate(), 5e-4);
    }
}

// ============================================================================
// Target network
// ============================================================================

mod target_tests {
    use super::*;

    #[test]
    fn target_frozen_until_sync() {
        let mut learner = make_learner(DqnConfig::default(), 1e-2);
        let sample_state = [0.5, -0.5, 0.25, 1.0];
        let before = forward_vec(learner.target(), &sample_state);

        let batch = vec![terminal(sample_state, 1, 5.0)];
        for _ in 0..20 {
            learner.optimize(&batch).unwrap();
        }
        assert_eq!(forward_vec(learner.target(), &sample_state), before);
        assert_ne!(forward_vec(learner.online(), &sample_state), before);

        learner.sync_target();
        assert_eq!(
            forward_vec(learner.target(), &sample_state),
            forward_vec(learner.online(), &sample_state)
        );
    }
}

// ============================================================================
// Snapshot / restore
// ============================================================================

mod snapshot_tests {
    use super::*;

    #[test]
    fn restore_reproduces_q_values() {
        let mut trained = make_learner(DqnConfig::default(), 1e-2);
        let batch = vec![terminal([1.0, 0.0, 1.0, 0.0], 0, 2.0)];
        for _ in 0..10 {
            trained.optimize(&batch).unwrap();
        }
        let snapshot = trained.snapshot().unwrap();
        assert!(!snapshot.student.is_empty());
        assert!(!snapshot.optimizer.is_empty());
        assert_eq!(snapshot.train_steps, 10);

        let restored = make_learner(DqnConfig::default(), 1e-2)
            .restore(&snapshot)
            .unwrap();
        let sample_state = [0.3, 0.1, -0.2, 0.9];
        let a = trained.q_values(&sample_state).unwrap();
        let b = restored.q_values(&sample_state).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
        assert_eq!(restored.train_steps(), 10);
    }

    #[test]
    fn restore_rejects_garbage() {
        let snapshot = NetworkSnapshot {
            student: vec![1, 2, 3],
            ..Default::default()
        };
        let result = make_learner(DqnConfig::default(), 1e-3).restore(&snapshot);
        assert!(matches!(result, Err(LearnerError::Record(_))));
    }
}

// ============================================================================
// Greedy teacher
// ============================================================================

mod teacher_tests {
    use super::*;

    #[test]
    fn teacher_follows_learner_argmax() {
        let learner = make_learner(DqnConfig::default(), 1e-3);
        let sample_state = [0.2, 0.4, 0.6, 0.8];
        let expected = learner.greedy_action(&sample_state).unwrap();
        let mut teacher = GreedyTeacher::new(learner);
        assert_eq!(teacher.infer(&sample_state), expected);
        assert_eq!(teacher.failures(), 0);
    }

    #[test]
    fn teacher_falls_back_to_zero_on_bad_state() {
        let mut teacher = GreedyTeacher::new(make_learner(DqnConfig::default(), 1e-3));
        assert_eq!(teacher.infer(&[1.0]), 0);
        assert_eq!(teacher.failures(), 1);
    }
}
