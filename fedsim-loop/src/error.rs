//! Error types for the fedsim-loop crate.

use thiserror::Error;

/// Top-level error type for run orchestration.
///
/// `Round` and `Eval` are fatal callback failures and carry the failing
/// round number; everything the loop treats as transient never surfaces
/// through this type (it lands in `RunOutcome::transient_failures`).
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Round {round} failed: {source}")]
    Round {
        round: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Evaluation at round {round} failed: {source}")]
    Eval {
        round: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Core(#[from] fedsim_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RunError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }
}
