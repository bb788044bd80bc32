//! Action divergence metric.
//!
//! Discrete actions map to control vectors (steer, gas, brake for the
//! driving task). Two actions are compared by cosine distance, rescaled by
//! the largest pairwise distance in the action set so that the most
//! divergent pair of actions lands at 1.0.
//!
//! ```text
//! d(a, b) = (1 - cos(a, b)) / max_{i<j} (1 - cos(v_i, v_j))
//! ```
//!
//! Zero vectors have no direction: two zero vectors are identical (0.0), a
//! zero vector against a non-zero one is maximally divergent (1.0, not
//! rescaled).

use serde::{Deserialize, Serialize};

/// Error building an action set.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSetError {
    /// The set has no actions.
    Empty,
    /// An action vector has a different length than the first.
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// Labels and vectors differ in count.
    LabelCountMismatch { vectors: usize, labels: usize },
    /// An action vector contains NaN or infinite entries.
    NonFinite { index: usize },
}

impl std::fmt::Display for ActionSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionSetError::Empty => write!(f, "action set is empty"),
            ActionSetError::DimensionMismatch { index, expected, got } => write!(
                f,
                "action {} has dimension {}, expected {}",
                index, got, expected
            ),
            ActionSetError::LabelCountMismatch { vectors, labels } => write!(
                f,
                "{} action vectors but {} labels",
                vectors, labels
            ),
            ActionSetError::NonFinite { index } => {
                write!(f, "action {} contains non-finite values", index)
            }
        }
    }
}

impl std::error::Error for ActionSetError {}

/// Raw cosine distance `1 - cos(a, b)` in [0, 2] with zero-vector handling.
///
/// Vectors of different length are compared over their common prefix.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let cos = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
            1.0 - cos
        }
    }
}

/// Discrete action set with labels and a precomputed normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSet {
    vectors: Vec<Vec<f32>>,
    labels: Vec<String>,
    max_distance: f32,
}

impl ActionSet {
    /// Build an action set. Computes the maximum pairwise distance once.
    pub fn new(vectors: Vec<Vec<f32>>, labels: Vec<String>) -> Result<Self, ActionSetError> {
        if vectors.is_empty() {
            return Err(ActionSetError::Empty);
        }
        if labels.len() != vectors.len() {
            return Err(ActionSetError::LabelCountMismatch {
                vectors: vectors.len(),
                labels: labels.len(),
            });
        }
        let expected = vectors[0].len();
        for (index, v) in vectors.iter().enumerate() {
            if v.len() != expected {
                return Err(ActionSetError::DimensionMismatch {
                    index,
                    expected,
                    got: v.len(),
                });
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(ActionSetError::NonFinite { index });
            }
        }

        let max_distance = max_pairwise_distance(&vectors);
        Ok(Self {
            vectors,
            labels,
            max_distance,
        })
    }

    /// Build an action set with generated labels `a0`, `a1`, ...
    pub fn unlabeled(vectors: Vec<Vec<f32>>) -> Result<Self, ActionSetError> {
        let labels = (0..vectors.len()).map(|i| format!("a{}", i)).collect();
        Self::new(vectors, labels)
    }

    /// The seven-action driving set: steer, gas, brake.
    pub fn driving() -> Self {
        let vectors = vec![
            vec![-1.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.8],
            vec![-1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ];
        let labels = ["Left", "Right", "Accel", "Brake", "Left+Accel", "Right+Accel", "No-Op"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let max_distance = max_pairwise_distance(&vectors);
        Self {
            vectors,
            labels,
            max_distance,
        }
    }

    /// Number of discrete actions.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the set is empty. Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Control vector of an action.
    pub fn vector(&self, index: usize) -> Option<&[f32]> {
        self.vectors.get(index).map(Vec::as_slice)
    }

    /// Human-readable label of an action.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Precomputed maximum pairwise cosine distance.
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Normalized distance between two discrete actions, in [0, 1].
    ///
    /// Equal indices are always 0. Out-of-range indices are maximally
    /// divergent.
    pub fn distance(&self, a: usize, b: usize) -> f32 {
        if a == b {
            return 0.0;
        }
        match (self.vector(a), self.vector(b)) {
            (Some(va), Some(vb)) => self.normalized(va, vb),
            _ => 1.0,
        }
    }

    /// Normalized distance between two arbitrary control vectors.
    pub fn normalized(&self, a: &[f32], b: &[f32]) -> f32 {
        let a_zero = a.iter().all(|x| *x == 0.0);
        let b_zero = b.iter().all(|x| *x == 0.0);
        if a_zero != b_zero {
            return 1.0;
        }
        let raw = cosine_distance(a, b);
        let scaled = if self.max_distance > 0.0 {
            raw / self.max_distance
        } else {
            raw
        };
        scaled.clamp(0.0, 1.0)
    }
}

fn max_pairwise_distance(vectors: &[Vec<f32>]) -> f32 {
    let mut max_dist = 0.0_f32;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            max_dist = max_dist.max(cosine_distance(&vectors[i], &vectors[j]));
        }
    }
    max_dist
}
