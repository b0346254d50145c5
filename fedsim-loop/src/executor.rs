//! The round/evaluation capability the training loop consumes.

use fedsim_core::MetricReport;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One experiment flavor (centralized, federated, …) as seen by the loop.
///
/// `State` is the opaque, serializable round state: everything needed to
/// resume — model parameters, optimizer state, accumulators. The loop owns
/// it between rounds and hands it to the checkpoint manager at round
/// boundaries.
///
/// `run_round` advances exactly one round and returns the new state plus
/// that round's metrics; `evaluate` computes held-out metrics without
/// consuming the state. Both return `anyhow::Result` so experiment code
/// can surface any error type; a returned error is fatal to the run.
pub trait RoundExecutor {
    type State: Serialize + DeserializeOwned;

    fn run_round(
        &mut self,
        state: Self::State,
        round: u64,
    ) -> anyhow::Result<(Self::State, MetricReport)>;

    fn evaluate(&mut self, state: &Self::State) -> anyhow::Result<MetricReport>;

    /// One-time held-out test metrics, computed after the final round.
    /// `None` (the default) means the experiment keeps no test split and
    /// the run records no `test/` metrics.
    fn test_evaluate(&mut self, _state: &Self::State) -> anyhow::Result<Option<MetricReport>> {
        Ok(None)
    }
}
