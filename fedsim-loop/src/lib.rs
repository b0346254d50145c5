//! # fedsim-loop — round orchestration for long-running experiments
//!
//! The round-driving engine behind fedsim experiments. An experiment hands
//! the loop a [`RoundExecutor`] (the round/evaluation capability) and an
//! initial state; the loop owns the round-by-round lifecycle:
//!
//! - restore the latest checkpoint on startup and resume after it, making
//!   runs idempotent across process restarts and preemptions;
//! - invoke the executor one round at a time (round boundaries are the
//!   only checkpoint/preemption points — nothing here is concurrent);
//! - stream per-round and evaluation metrics, tagged with wall-clock
//!   timings, to the run directory's metric history;
//! - save checkpoint records on the configured cadence, pruning old ones.
//!
//! Executor failures are fatal and propagate with the failing round number;
//! checkpoint and metric write failures are transient — logged, surfaced in
//! the final [`RunOutcome`], and never abort an otherwise-healthy run.
//!
//! A run directory has a single writer at a time; concurrent writers are
//! not coordinated.

pub mod centralized;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod executor;
pub mod federated;
pub mod metrics;
pub mod schedule;
pub mod timing;
pub mod training_loop;

pub use centralized::{CentralizedExecutor, FitEvaluate};
pub use checkpoint::{CheckpointInfo, CheckpointManager};
pub use config::RunConfig;
pub use error::RunError;
pub use executor::RoundExecutor;
pub use federated::{ClientUpdate, ClientWorkload, FederatedExecutor, FederatedState};
pub use metrics::{MetricsFrame, MetricsManager};
pub use schedule::LrSchedule;
pub use training_loop::{RunOutcome, TrainingLoop, TransientFailure};
