//! Per-episode and per-run statistics.
//!
//! `EpisodeAccumulator` collects step-level values while an episode runs and
//! turns them into an [`EpisodeStats`] at episode end. [`RunStats`] keeps the
//! run-level histories that go into the checkpoint.

use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackClass;

/// Counts of feedback classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCounts {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

impl FeedbackCounts {
    pub fn record(&mut self, class: FeedbackClass) {
        match class {
            FeedbackClass::Positive => self.positive += 1,
            FeedbackClass::Neutral => self.neutral += 1,
            FeedbackClass::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.positive + self.neutral + self.negative
    }

    pub fn positive_ratio(&self) -> f32 {
        ratio(self.positive, self.total())
    }

    pub fn negative_ratio(&self) -> f32 {
        ratio(self.negative, self.total())
    }

    pub fn merge(&mut self, other: &FeedbackCounts) {
        self.positive += other.positive;
        self.neutral += other.neutral;
        self.negative += other.negative;
    }
}

fn ratio(part: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// Zero-based episode index.
    pub episode: usize,
    pub steps: usize,
    /// Global step count at episode end.
    pub global_step: usize,
    /// Sum of shaped rewards.
    pub reward: f32,
    /// Sum of raw environment rewards.
    pub env_reward: f32,
    /// Mean loss over the optimization steps of the episode, if any ran.
    pub mean_loss: Option<f32>,
    pub epsilon: f64,
    pub learning_rate: f64,
    /// Post-warmup feedback classes observed in the episode.
    pub feedback: FeedbackCounts,
    /// Rater events consumed in the episode.
    pub ratings: u64,
    /// Mean teacher distance, teacher mode only.
    pub mean_distance: Option<f32>,
}

/// Step-level collector for the running episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeAccumulator {
    steps: usize,
    reward: f32,
    env_reward: f32,
    loss_sum: f64,
    loss_count: usize,
    feedback: FeedbackCounts,
    ratings: u64,
    distance_sum: f64,
    distance_count: usize,
}

impl EpisodeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, shaped_reward: f32, env_reward: f32) {
        self.steps += 1;
        self.reward += shaped_reward;
        self.env_reward += env_reward;
    }

    pub fn record_loss(&mut self, loss: f32) {
        if loss.is_finite() {
            self.loss_sum += loss as f64;
            self.loss_count += 1;
        }
    }

    pub fn record_feedback(&mut self, class: FeedbackClass) {
        self.feedback.record(class);
    }

    pub fn record_rating(&mut self) {
        self.ratings += 1;
    }

    pub fn record_distance(&mut self, distance: f32) {
        self.distance_sum += distance as f64;
        self.distance_count += 1;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn reward(&self) -> f32 {
        self.reward
    }

    /// Close the episode and reset the accumulator.
    pub fn finish(
        &mut self,
        episode: usize,
        global_step: usize,
        epsilon: f64,
        learning_rate: f64,
    ) -> EpisodeStats {
        let acc = std::mem::take(self);
        EpisodeStats {
            episode,
            steps: acc.steps,
            global_step,
            reward: acc.reward,
            env_reward: acc.env_reward,
            mean_loss: (acc.loss_count > 0).then(|| (acc.loss_sum / acc.loss_count as f64) as f32),
            epsilon,
            learning_rate,
            feedback: acc.feedback,
            ratings: acc.ratings,
            mean_distance: (acc.distance_count > 0)
                .then(|| (acc.distance_sum / acc.distance_count as f64) as f32),
        }
    }
}

/// Mean, spread and range of the teacher distances of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub count: usize,
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

/// Run-level histories and totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub episodes: usize,
    pub total_steps: usize,
    pub total_reward: f64,
    pub reward_history: Vec<f32>,
    pub loss_history: Vec<f32>,
    pub distance_history: Vec<f32>,
    pub feedback: FeedbackCounts,
    pub ratings: u64,
    /// Replay insertions beyond the first copy of each transition.
    pub extra_copies: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(&mut self, episode: &EpisodeStats) {
        self.episodes += 1;
        self.total_reward += episode.reward as f64;
        self.reward_history.push(episode.reward);
        if let Some(loss) = episode.mean_loss {
            self.loss_history.push(loss);
        }
        self.feedback.merge(&episode.feedback);
        self.ratings += episode.ratings;
    }

    pub fn record_distance(&mut self, distance: f32) {
        self.distance_history.push(distance);
    }

    pub fn record_copies(&mut self, count: usize) {
        self.extra_copies += count.saturating_sub(1) as u64;
    }

    /// Mean episode reward over the last `window` episodes.
    pub fn recent_reward(&self, window: usize) -> f32 {
        let n = window.min(self.reward_history.len());
        if n == 0 {
            return 0.0;
        }
        let tail = &self.reward_history[self.reward_history.len() - n..];
        tail.iter().sum::<f32>() / n as f32
    }

    pub fn distance_summary(&self) -> Option<DistanceSummary> {
        let values = &self.distance_history;
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().map(|&d| d as f64).sum::<f64>() / n;
        let var = values.iter().map(|&d| (d as f64 - mean).powi(2)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));
        Some(DistanceSummary {
            count: values.len(),
            mean: mean as f32,
            std: var.sqrt() as f32,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_summarizes_and_resets() {
        let mut acc = EpisodeAccumulator::new();
        acc.record_step(1.5, 1.0);
        acc.record_step(-0.5, 0.0);
        acc.record_loss(0.2);
        acc.record_loss(f32::NAN);
        acc.record_loss(0.4);
        acc.record_feedback(FeedbackClass::Positive);
        acc.record_feedback(FeedbackClass::Negative);
        acc.record_feedback(FeedbackClass::Positive);
        acc.record_distance(0.5);
        acc.record_distance(1.0);

        let stats = acc.finish(3, 120, 0.1, 1e-4);
        assert_eq!(stats.episode, 3);
        assert_eq!(stats.steps, 2);
        assert_eq!(stats.reward, 1.0);
        assert_eq!(stats.env_reward, 1.0);
        assert!((stats.mean_loss.unwrap() - 0.3).abs() < 1e-6);
        assert!((stats.feedback.positive_ratio() - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(stats.mean_distance, Some(0.75));

        assert_eq!(acc.steps(), 0);
        let empty = acc.finish(4, 120, 0.1, 1e-4);
        assert_eq!(empty.mean_loss, None);
        assert_eq!(empty.mean_distance, None);
        assert_eq!(empty.feedback.positive_ratio(), 0.0);
    }

    #[test]
    fn run_stats_histories() {
        let mut run = RunStats::new();
        let mut acc = EpisodeAccumulator::new();
        for reward in [1.0, 2.0, 6.0] {
            acc.record_step(reward, reward);
            acc.record_loss(reward);
            let stats = acc.finish(run.episodes, 0, 0.0, 0.0);
            run.record_episode(&stats);
        }
        assert_eq!(run.episodes, 3);
        assert_eq!(run.reward_history, vec![1.0, 2.0, 6.0]);
        assert_eq!(run.loss_history.len(), 3);
        assert_eq!(run.recent_reward(2), 4.0);
        assert_eq!(run.recent_reward(100), 3.0);
        assert_eq!(RunStats::new().recent_reward(10), 0.0);

        run.record_copies(4);
        run.record_copies(1);
        assert_eq!(run.extra_copies, 3);
    }

    #[test]
    fn distance_summary() {
        let mut run = RunStats::new();
        assert!(run.distance_summary().is_none());
        for d in [0.0, 0.5, 1.0] {
            run.record_distance(d);
        }
        let s = run.distance_summary().unwrap();
        assert_eq!(s.count, 3);
        assert!((s.mean - 0.5).abs() < 1e-6);
        assert!((s.std - (1.0f32 / 6.0).sqrt()).abs() < 1e-6);
        assert_eq!((s.min, s.max), (0.0, 1.0));
    }
}
