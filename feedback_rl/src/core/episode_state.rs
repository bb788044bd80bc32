//! Episode end classification.
//!
//! - **Terminal**: the environment reached an absorbing state. No bootstrap.
//! - **Truncated**: an external limit cut the episode short. Whether the
//!   learner bootstraps from the last state is a training option; by default
//!   both kinds of end store no next state.

/// Episode state after an environment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EpisodeState {
    /// Episode is ongoing.
    #[default]
    Running,
    /// Episode reached an absorbing state.
    Terminal,
    /// Episode hit an external limit.
    Truncated,
}

impl EpisodeState {
    /// Classify from the environment's flags. Terminal wins over truncated.
    #[inline]
    pub fn from_flags(terminated: bool, truncated: bool) -> Self {
        if terminated {
            Self::Terminal
        } else if truncated {
            Self::Truncated
        } else {
            Self::Running
        }
    }

    /// Whether the episode is over.
    #[inline]
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Whether the stored transition should keep its next state.
    ///
    /// Running steps always do. Truncated steps do only when
    /// `bootstrap_truncated` is set. Terminal steps never do.
    #[inline]
    pub fn keeps_next_state(&self, bootstrap_truncated: bool) -> bool {
        match self {
            Self::Running => true,
            Self::Truncated => bootstrap_truncated,
            Self::Terminal => false,
        }
    }
}
