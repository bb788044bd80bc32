//! Run checkpointing.
//!
//! One directory per run under `checkpoint_dir`:
//!
//! ```text
//! <checkpoint_dir>/<run_id>/
//!     run.json        RunCheckpoint metadata (serde_json)
//!     student.bin     online network record
//!     target.bin      target network record
//!     optimizer.bin   optimizer record
//! ```
//!
//! Binary files are written before `run.json`, so a directory with a readable
//! `run.json` always has complete weights next to it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::unix_now;
use crate::learner::NetworkSnapshot;
use crate::messages::FinishReason;
use crate::metrics::RunStats;
use crate::runners::TrainerConfig;

const RUN_FILE: &str = "run.json";
const STUDENT_FILE: &str = "student.bin";
const TARGET_FILE: &str = "target.bin";
const OPTIMIZER_FILE: &str = "optimizer.bin";

/// Configuration for the checkpointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointerConfig {
    pub checkpoint_dir: PathBuf,
    /// Episodes between intermediate saves (0 = only at the end of the run).
    pub save_every_episodes: usize,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            save_every_episodes: 0,
        }
    }
}

impl CheckpointerConfig {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_save_every_episodes(mut self, episodes: usize) -> Self {
        self.save_every_episodes = episodes;
        self
    }
}

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    Io(io::Error),
    Json(serde_json::Error),
    /// Run ids are used as directory names.
    InvalidRunId(String),
    NotFound(PathBuf),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Json(e) => write!(f, "run record error: {}", e),
            CheckpointError::InvalidRunId(id) => write!(f, "invalid run id: {:?}", id),
            CheckpointError::NotFound(path) => write!(f, "no checkpoint at {}", path.display()),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(e: serde_json::Error) -> Self {
        CheckpointError::Json(e)
    }
}

/// Whether `run_id` is safe to use as a single path component.
pub fn is_valid_run_id(run_id: &str) -> bool {
    !run_id.is_empty()
        && run_id != "."
        && run_id != ".."
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Everything persisted at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub run_id: String,
    /// Seconds since the unix epoch.
    pub saved_at: f64,
    pub config: TrainerConfig,
    /// `None` for intermediate saves.
    pub finish_reason: Option<FinishReason>,
    pub steps: usize,
    pub episodes: usize,
    pub train_steps: u64,
    pub stats: RunStats,
    /// Stored next to `run.json` as binary records.
    #[serde(skip)]
    pub network: NetworkSnapshot,
}

impl RunCheckpoint {
    pub fn new(
        run_id: impl Into<String>,
        config: TrainerConfig,
        steps: usize,
        episodes: usize,
        stats: RunStats,
        network: NetworkSnapshot,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            saved_at: unix_now(),
            config,
            finish_reason: None,
            steps,
            episodes,
            train_steps: network.train_steps,
            stats,
            network,
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }
}

/// Writes and reads [`RunCheckpoint`]s.
pub struct Checkpointer {
    config: CheckpointerConfig,
    saves: usize,
}

impl Checkpointer {
    /// Creates the checkpoint directory if it doesn't exist.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self { config, saves: 0 })
    }

    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Whether an intermediate save is due after `episodes` finished episodes.
    pub fn should_save(&self, episodes: usize) -> bool {
        let every = self.config.save_every_episodes;
        every > 0 && episodes > 0 && episodes % every == 0
    }

    pub fn run_dir(&self, run_id: &str) -> Result<PathBuf, CheckpointError> {
        if !is_valid_run_id(run_id) {
            return Err(CheckpointError::InvalidRunId(run_id.to_string()));
        }
        Ok(self.config.checkpoint_dir.join(run_id))
    }

    /// Save and return the run directory.
    pub fn save(&mut self, checkpoint: &RunCheckpoint) -> Result<PathBuf, CheckpointError> {
        let dir = self.run_dir(&checkpoint.run_id)?;
        fs::create_dir_all(&dir)?;

        fs::write(dir.join(STUDENT_FILE), &checkpoint.network.student)?;
        fs::write(dir.join(TARGET_FILE), &checkpoint.network.target)?;
        fs::write(dir.join(OPTIMIZER_FILE), &checkpoint.network.optimizer)?;

        let json = serde_json::to_vec_pretty(checkpoint)?;
        let tmp = dir.join(format!("{}.tmp", RUN_FILE));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, dir.join(RUN_FILE))?;

        self.saves += 1;
        Ok(dir)
    }

    pub fn exists(&self, run_id: &str) -> bool {
        self.run_dir(run_id)
            .map(|dir| dir.join(RUN_FILE).is_file())
            .unwrap_or(false)
    }

    /// Load a run record together with its network snapshot.
    pub fn load(&self, run_id: &str) -> Result<RunCheckpoint, CheckpointError> {
        let dir = self.run_dir(run_id)?;
        Self::load_dir(&dir)
    }

    /// Load from an explicit run directory.
    pub fn load_dir(dir: &Path) -> Result<RunCheckpoint, CheckpointError> {
        let run_file = dir.join(RUN_FILE);
        if !run_file.is_file() {
            return Err(CheckpointError::NotFound(dir.to_path_buf()));
        }
        let mut checkpoint: RunCheckpoint = serde_json::from_slice(&fs::read(&run_file)?)?;
        checkpoint.network = NetworkSnapshot {
            student: fs::read(dir.join(STUDENT_FILE))?,
            target: fs::read(dir.join(TARGET_FILE))?,
            optimizer: fs::read(dir.join(OPTIMIZER_FILE))?,
            train_steps: checkpoint.train_steps,
        };
        Ok(checkpoint)
    }

    /// Run ids with a saved record, sorted.
    pub fn list_runs(&self) -> Result<Vec<String>, CheckpointError> {
        let mut runs: Vec<String> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join(RUN_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        runs.sort();
        Ok(runs)
    }
}
