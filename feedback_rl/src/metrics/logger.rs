//! Training loggers.
//!
//! The trainer hands one [`TrainingSnapshot`] per finished episode to a
//! [`MetricsLogger`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use super::stats::{EpisodeStats, RunStats};

/// Episode-level snapshot for logging.
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
    /// Global environment step.
    pub step: usize,
    /// Completed episodes.
    pub episodes: usize,
    /// Shaped reward of the last episode.
    pub episode_reward: f32,
    /// Mean shaped reward over recent episodes.
    pub avg_reward: f32,
    pub loss: Option<f32>,
    pub epsilon: f64,
    pub learning_rate: f64,
    pub positive_ratio: f32,
    pub negative_ratio: f32,
    pub mean_distance: Option<f32>,
    pub replay_len: usize,
}

impl TrainingSnapshot {
    /// Episodes averaged into `avg_reward`.
    pub const REWARD_WINDOW: usize = 100;

    pub fn new(step: usize, episodes: usize, episode_reward: f32, avg_reward: f32) -> Self {
        Self {
            step,
            episodes,
            episode_reward,
            avg_reward,
            loss: None,
            epsilon: 0.0,
            learning_rate: 0.0,
            positive_ratio: 0.0,
            negative_ratio: 0.0,
            mean_distance: None,
            replay_len: 0,
        }
    }

    /// Snapshot after `episode` was recorded into `run`.
    pub fn from_episode(episode: &EpisodeStats, run: &RunStats, replay_len: usize) -> Self {
        Self {
            step: episode.global_step,
            episodes: run.episodes,
            episode_reward: episode.reward,
            avg_reward: run.recent_reward(Self::REWARD_WINDOW),
            loss: episode.mean_loss,
            epsilon: episode.epsilon,
            learning_rate: episode.learning_rate,
            positive_ratio: episode.feedback.positive_ratio(),
            negative_ratio: episode.feedback.negative_ratio(),
            mean_distance: episode.mean_distance,
            replay_len,
        }
    }

    pub fn with_loss(mut self, loss: f32) -> Self {
        self.loss = Some(loss);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger: Send {
    fn log(&mut self, snapshot: &TrainingSnapshot);

    fn flush(&mut self);
}

/// Console logger with fixed-width columns, every `log_interval` episodes.
pub struct ConsoleLogger {
    log_interval: usize,
    last_logged: Option<usize>,
    start_time: Instant,
    show_header: bool,
}

impl ConsoleLogger {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
            last_logged: None,
            start_time: Instant::now(),
            show_header: true,
        }
    }

    pub fn reset_timer(&mut self) {
        self.start_time = Instant::now();
    }

    fn should_log(&self, episodes: usize) -> bool {
        match self.last_logged {
            None => true,
            Some(last) => episodes >= last + self.log_interval,
        }
    }

    fn print_header(&self) {
        println!(
            "{:>8} {:>9} {:>9} {:>9} {:>9} {:>6} {:>9} {:>5} {:>5} {:>6} {:>7}",
            "Episode", "Step", "Reward", "Avg", "Loss", "Eps", "LR", "Pos%", "Neg%", "Dist", "SPS"
        );
        println!("{}", "-".repeat(94));
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        if !self.should_log(snapshot.episodes) {
            return;
        }
        if self.show_header {
            self.print_header();
            self.show_header = false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let sps = if elapsed > 0.0 {
            snapshot.step as f32 / elapsed
        } else {
            0.0
        };
        let loss = snapshot
            .loss
            .map(|l| format!("{:.4}", l))
            .unwrap_or_else(|| "-".to_string());
        let dist = snapshot
            .mean_distance
            .map(|d| format!("{:.3}", d))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>8} {:>9} {:>9.2} {:>9.2} {:>9} {:>6.3} {:>9.2e} {:>5.0} {:>5.0} {:>6} {:>7.0}",
            snapshot.episodes,
            snapshot.step,
            snapshot.episode_reward,
            snapshot.avg_reward,
            loss,
            snapshot.epsilon,
            snapshot.learning_rate,
            snapshot.positive_ratio * 100.0,
            snapshot.negative_ratio * 100.0,
            dist,
            sps
        );

        self.last_logged = Some(snapshot.episodes);
    }

    fn flush(&mut self) {}
}

/// CSV file logger for analysis.
pub struct CSVLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CSVLogger {
    pub const HEADER: &'static str = "episode,step,episode_reward,avg_reward,loss,epsilon,\
learning_rate,positive_ratio,negative_ratio,mean_distance,replay_len,elapsed_secs";

    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", Self::HEADER)?;
        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

fn optional(value: Option<f32>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

impl MetricsLogger for CSVLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let result = writeln!(
            self.writer,
            "{},{},{:.4},{:.4},{},{:.4},{:.8},{:.4},{:.4},{},{},{:.2}",
            snapshot.episodes,
            snapshot.step,
            snapshot.episode_reward,
            snapshot.avg_reward,
            optional(snapshot.loss),
            snapshot.epsilon,
            snapshot.learning_rate,
            snapshot.positive_ratio,
            snapshot.negative_ratio,
            optional(snapshot.mean_distance),
            snapshot.replay_len,
            elapsed
        );
        if let Err(e) = result {
            log::warn!("[CSVLogger] write failed: {}", e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("[CSVLogger] flush failed: {}", e);
        }
    }
}

impl Drop for CSVLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fan-out to several loggers.
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
        }
    }

    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        for logger in &mut self.loggers {
            logger.log(snapshot);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::stats::EpisodeAccumulator;
    use crate::feedback::FeedbackClass;

    #[test]
    fn snapshot_from_episode() {
        let mut run = RunStats::new();
        let mut acc = EpisodeAccumulator::new();
        acc.record_step(2.0, 1.0);
        acc.record_feedback(FeedbackClass::Negative);
        acc.record_loss(0.5);
        let episode = acc.finish(0, 10, 0.2, 1e-3);
        run.record_episode(&episode);

        let snapshot = TrainingSnapshot::from_episode(&episode, &run, 64);
        assert_eq!(snapshot.step, 10);
        assert_eq!(snapshot.episodes, 1);
        assert_eq!(snapshot.avg_reward, 2.0);
        assert_eq!(snapshot.loss, Some(0.5));
        assert_eq!(snapshot.negative_ratio, 1.0);
        assert_eq!(snapshot.replay_len, 64);
    }

    #[test]
    fn console_logger_respects_interval() {
        let mut logger = ConsoleLogger::new(10);
        assert!(logger.should_log(1));
        logger.log(&TrainingSnapshot::new(100, 1, 1.0, 1.0));
        assert!(!logger.should_log(5));
        assert!(logger.should_log(11));
    }

    #[test]
    fn csv_logger_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        {
            let mut logger = CSVLogger::new(&path).unwrap();
            logger.log(&TrainingSnapshot::new(50, 1, 3.0, 3.0).with_loss(0.25));
            logger.log(&TrainingSnapshot::new(90, 2, 1.0, 2.0));
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSVLogger::HEADER);
        assert!(lines[1].starts_with("1,50,3.0000,3.0000,0.250000,"));
        let cols = CSVLogger::HEADER.split(',').count();
        assert!(lines.iter().all(|l| l.split(',').count() == cols));
    }

    #[test]
    fn multi_logger_fans_out() {
        let multi = MultiLogger::new().add(ConsoleLogger::new(1));
        assert_eq!(multi.len(), 1);
        let mut multi = multi;
        multi.log(&TrainingSnapshot::new(10, 1, 1.0, 1.0));
        multi.flush();
    }
}
