//! The generic training loop — the round-driving engine.
//!
//! Owns the round-by-round lifecycle: restore, execute, log, evaluate,
//! checkpoint. One round at a time, blocking on the executor; round
//! boundaries are the only checkpoint points, so an interrupted process
//! resumes exactly one round past its last durable record.

use crate::checkpoint::CheckpointManager;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::executor::RoundExecutor;
use crate::metrics::MetricsManager;
use crate::timing::{timed, RoundTimer};
use fedsim_core::{CoreError, MetricReport};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A non-fatal I/O failure the loop absorbed: the run kept going, but the
/// caller should know.
#[derive(Debug, Clone)]
pub struct TransientFailure {
    pub round: u64,
    pub what: &'static str,
    pub message: String,
}

/// What a run did, returned on success.
#[derive(Debug)]
pub struct RunOutcome<S> {
    /// Final round state after the last executed (or restored) round.
    pub state: S,
    /// First round this invocation executed; `>= total_rounds` when the
    /// run was already complete and zero rounds ran.
    pub first_round: u64,
    /// Rounds executed by this invocation.
    pub rounds_completed: u64,
    /// Checkpoint/metric write failures absorbed along the way.
    pub transient_failures: Vec<TransientFailure>,
    pub wall_clock: Duration,
}

/// The round-driving engine.
///
/// Collaborators are injected so the loop stays testable in isolation;
/// [`TrainingLoop::new`] wires the standard managers from the run
/// directory.
pub struct TrainingLoop {
    config: RunConfig,
    checkpoints: CheckpointManager,
    metrics: MetricsManager,
}

impl TrainingLoop {
    /// Build a loop with the standard managers rooted in
    /// `config.run_dir`. Fails fast on invalid configuration.
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        let checkpoints = CheckpointManager::new(&config.run_dir, config.checkpoint_retention);
        let metrics = MetricsManager::open(&config.run_dir)?;
        Self::with_managers(config, checkpoints, metrics)
    }

    /// Build a loop around explicit collaborators.
    pub fn with_managers(
        config: RunConfig,
        checkpoints: CheckpointManager,
        metrics: MetricsManager,
    ) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            checkpoints,
            metrics,
        })
    }

    pub fn metrics(&self) -> &MetricsManager {
        &self.metrics
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Drive the run to `total_rounds`.
    ///
    /// Restores the latest checkpoint first and resumes one round past
    /// it; with no (valid) checkpoint the run starts fresh from round 0
    /// with `initial_state`. Evaluation and checkpointing follow their
    /// cadences and always fire on the final round, so a completed run
    /// re-invoked against the same directory performs zero rounds.
    ///
    /// After the last round the executor's one-time test evaluation runs
    /// (when it provides one) and its metrics land under `test/` in an
    /// extra history row past the training rounds.
    pub fn run<E: RoundExecutor>(
        &mut self,
        initial_state: E::State,
        executor: &mut E,
    ) -> Result<RunOutcome<E::State>, RunError> {
        self.config.validate()?;
        let run_started = Instant::now();
        let total = self.config.total_rounds;

        let (mut state, first_round) = match self.checkpoints.load_latest::<E::State>()? {
            Some((state, round)) => {
                info!(round, "restored checkpoint, resuming at round {}", round + 1);
                (state, round + 1)
            }
            None => {
                info!("no checkpoint found, starting at round 0");
                (initial_state, 0)
            }
        };

        if first_round >= total {
            info!(total_rounds = total, "run already complete, nothing to do");
            return Ok(RunOutcome {
                state,
                first_round,
                rounds_completed: 0,
                transient_failures: Vec::new(),
                wall_clock: run_started.elapsed(),
            });
        }

        let mut failures = Vec::new();
        let mut timer = RoundTimer::new();

        for round in first_round..total {
            let last = round + 1 == total;

            timer.start();
            let (next_state, round_metrics) = executor
                .run_round(state, round)
                .map_err(|source| RunError::Round { round, source })?;
            state = next_state;
            let round_secs = timer.stop_secs();

            let mut report = round_metrics;
            report.insert_scalar("round_seconds", round_secs);
            self.log(round, &report, &mut failures)?;

            if last || round % self.config.rounds_per_eval == 0 {
                let (result, eval_secs) = timed(|| executor.evaluate(&state));
                let eval_metrics =
                    result.map_err(|source| RunError::Eval { round, source })?;
                let mut eval_report = eval_metrics.prefixed("eval");
                eval_report.insert_scalar("eval_seconds", eval_secs);
                self.log(round, &eval_report, &mut failures)?;
            }

            if last || round % self.config.rounds_per_checkpoint == 0 {
                let (result, checkpoint_secs) = timed(|| self.checkpoints.save(&state, round));
                match result {
                    Ok(()) => {
                        let mut overhead = MetricReport::new();
                        overhead.insert_scalar("checkpoint_seconds", checkpoint_secs);
                        self.log(round, &overhead, &mut failures)?;
                    }
                    Err(e) => {
                        warn!(round, error = %e, "checkpoint save failed, training continues");
                        failures.push(TransientFailure {
                            round,
                            what: "checkpoint",
                            message: e.to_string(),
                        });
                    }
                }
            }

            info!(
                round,
                round_secs,
                eta_secs = timer.eta_secs(total - round - 1),
                "round complete"
            );
        }

        let (result, test_secs) = timed(|| executor.test_evaluate(&state));
        if let Some(test_metrics) =
            result.map_err(|source| RunError::Eval { round: total, source })?
        {
            let mut test_report = test_metrics.prefixed("test");
            test_report.insert_scalar("test_seconds", test_secs);
            // Extra row past the last training round, so test metrics
            // never collide with that round's train/eval columns.
            self.log(total, &test_report, &mut failures)?;
        }

        Ok(RunOutcome {
            state,
            first_round,
            rounds_completed: total - first_round,
            transient_failures: failures,
            wall_clock: run_started.elapsed(),
        })
    }

    /// Metric writes are transient failures; a malformed report is a
    /// callback contract violation and stays fatal.
    fn log(
        &mut self,
        round: u64,
        report: &MetricReport,
        failures: &mut Vec<TransientFailure>,
    ) -> Result<(), RunError> {
        match self.metrics.log_scalars(round, report) {
            Ok(()) => Ok(()),
            Err(e @ RunError::Core(CoreError::InvalidMetric(_))) => Err(e),
            Err(e) => {
                warn!(round, error = %e, "metric write failed, training continues");
                failures.push(TransientFailure {
                    round,
                    what: "metrics",
                    message: e.to_string(),
                });
                Ok(())
            }
        }
    }
}
