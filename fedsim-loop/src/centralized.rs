//! Centralized specialization — a fit/evaluate cycle as rounds.
//!
//! Standard single-process training exposes a fit-one-pass/evaluate pair;
//! [`CentralizedExecutor`] wraps that pair into the round abstraction the
//! loop drives, applying a learning-rate schedule per round and namespacing
//! training metrics under `train/`. Held-out metrics get the loop's
//! uniform `eval/` prefix.

use crate::executor::RoundExecutor;
use crate::schedule::LrSchedule;
use fedsim_core::MetricReport;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// What a standard train/eval cycle provides.
pub trait FitEvaluate {
    type State: Serialize + DeserializeOwned;

    /// One training pass at the given learning rate.
    fn fit_round(
        &mut self,
        state: Self::State,
        lr: f64,
        round: u64,
    ) -> anyhow::Result<(Self::State, MetricReport)>;

    /// Held-out metrics for the current state.
    fn evaluate(&mut self, state: &Self::State) -> anyhow::Result<MetricReport>;

    /// Metrics on a held-out test split, computed once after training.
    /// Defaults to `None` for models without a test split.
    fn test_evaluate(&mut self, _state: &Self::State) -> anyhow::Result<Option<MetricReport>> {
        Ok(None)
    }
}

/// Adapts a [`FitEvaluate`] model into a [`RoundExecutor`].
pub struct CentralizedExecutor<M> {
    model: M,
    schedule: LrSchedule,
}

impl<M: FitEvaluate> CentralizedExecutor<M> {
    pub fn new(model: M, schedule: LrSchedule) -> Self {
        Self { model, schedule }
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

impl<M: FitEvaluate> RoundExecutor for CentralizedExecutor<M> {
    type State = M::State;

    fn run_round(
        &mut self,
        state: Self::State,
        round: u64,
    ) -> anyhow::Result<(Self::State, MetricReport)> {
        let lr = self.schedule.lr(round);
        let (state, mut metrics) = self.model.fit_round(state, lr, round)?;
        metrics.insert_scalar("lr", lr);
        Ok((state, metrics.prefixed("train")))
    }

    fn evaluate(&mut self, state: &Self::State) -> anyhow::Result<MetricReport> {
        self.model.evaluate(state)
    }

    fn test_evaluate(&mut self, state: &Self::State) -> anyhow::Result<Option<MetricReport>> {
        self.model.test_evaluate(state)
    }
}
