//! Error types for the fedsim-core crate.

use thiserror::Error;

/// Top-level error type for core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_metric(msg: impl Into<String>) -> Self {
        Self::InvalidMetric(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}
