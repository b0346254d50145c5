//! Run configuration — the recognized knobs of a training run.

use crate::error::RunError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one training run.
///
/// Cadences count rounds: `rounds_per_checkpoint = 5` saves after rounds
/// 0, 5, 10, … (and always after the final round). All counts must be
/// positive; `validate` fails fast before any round executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of the run directory (checkpoints, metric logs, run metadata).
    pub run_dir: PathBuf,
    /// Total number of rounds, exclusive of rounds already completed when
    /// resuming.
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u64,
    /// Save a checkpoint every this many rounds.
    #[serde(default = "default_rounds_per_checkpoint")]
    pub rounds_per_checkpoint: u64,
    /// Run held-out evaluation every this many rounds.
    #[serde(default = "default_rounds_per_eval")]
    pub rounds_per_eval: u64,
    /// Number of most-recent checkpoint records to retain.
    #[serde(default = "default_checkpoint_retention")]
    pub checkpoint_retention: usize,
}

fn default_total_rounds() -> u64 {
    10
}

fn default_rounds_per_checkpoint() -> u64 {
    1
}

fn default_rounds_per_eval() -> u64 {
    1
}

fn default_checkpoint_retention() -> usize {
    5
}

impl RunConfig {
    /// A config with defaults under `run_dir`.
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            total_rounds: default_total_rounds(),
            rounds_per_checkpoint: default_rounds_per_checkpoint(),
            rounds_per_eval: default_rounds_per_eval(),
            checkpoint_retention: default_checkpoint_retention(),
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RunError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RunError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero-valued budgets and cadences before any round runs.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.total_rounds == 0 {
            return Err(RunError::config("total_rounds must be positive"));
        }
        if self.rounds_per_checkpoint == 0 {
            return Err(RunError::config("rounds_per_checkpoint must be positive"));
        }
        if self.rounds_per_eval == 0 {
            return Err(RunError::config("rounds_per_eval must be positive"));
        }
        if self.checkpoint_retention == 0 {
            return Err(RunError::config("checkpoint_retention must be positive"));
        }
        Ok(())
    }
}
