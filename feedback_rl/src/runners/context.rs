//! Mutable per-run counters owned by the training loop.

use crate::feedback::StepClock;
use crate::metrics::{EpisodeAccumulator, EpisodeStats, RunStats};

/// Step and episode bookkeeping for one run.
///
/// Only the training loop touches this; the control plane reads
/// [`RunProgress`](crate::metrics::RunProgress) instead.
#[derive(Debug, Clone)]
pub struct TrainingContext {
    /// Completed environment steps.
    pub steps_done: usize,
    /// Completed episodes.
    pub episodes: usize,
    pub episode: EpisodeAccumulator,
    pub stats: RunStats,
    pub epsilon: f64,
    warmup_end: usize,
    total: usize,
}

impl TrainingContext {
    pub fn new(warmup_end: usize, total: usize) -> Self {
        Self {
            steps_done: 0,
            episodes: 0,
            episode: EpisodeAccumulator::new(),
            stats: RunStats::new(),
            epsilon: 1.0,
            warmup_end,
            total,
        }
    }

    /// Clock for the step about to be taken.
    pub fn clock(&self) -> StepClock {
        StepClock::new(self.steps_done + 1, self.warmup_end, self.total)
    }

    pub fn is_finished(&self) -> bool {
        self.steps_done >= self.total
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn warmup_end(&self) -> usize {
        self.warmup_end
    }

    /// Close the running episode and fold it into the run statistics.
    pub fn finish_episode(&mut self, learning_rate: f64) -> EpisodeStats {
        let stats = self
            .episode
            .finish(self.episodes, self.steps_done, self.epsilon, learning_rate);
        self.stats.record_episode(&stats);
        self.stats.total_steps = self.steps_done;
        self.episodes += 1;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_one_based() {
        let mut ctx = TrainingContext::new(10, 100);
        assert_eq!(ctx.clock().step, 1);
        assert!(ctx.clock().in_warmup());
        ctx.steps_done = 9;
        assert_eq!(ctx.clock().step, 10);
        assert!(!ctx.clock().in_warmup());
        ctx.steps_done = 100;
        assert!(ctx.is_finished());
    }

    #[test]
    fn finish_episode_advances_counters() {
        let mut ctx = TrainingContext::new(0, 100);
        ctx.steps_done = 7;
        ctx.epsilon = 0.3;
        ctx.episode.record_step(1.0, 1.0);
        ctx.episode.record_step(2.0, 2.0);

        let first = ctx.finish_episode(1e-3);
        assert_eq!(first.episode, 0);
        assert_eq!(first.steps, 2);
        assert_eq!(first.global_step, 7);
        assert_eq!(first.epsilon, 0.3);
        assert_eq!(ctx.episodes, 1);
        assert_eq!(ctx.stats.total_steps, 7);
        assert_eq!(ctx.stats.reward_history, vec![3.0]);

        let second = ctx.finish_episode(1e-3);
        assert_eq!(second.episode, 1);
        assert_eq!(second.steps, 0);
    }
}
