//! Federated specialization — rounds combining many simulated clients.
//!
//! A federated round samples a cohort of clients, runs each one's local
//! work against the current global parameters, then combines the results:
//! parameter vectors by example-weighted averaging (FedAvg) and client
//! metrics by weighted-mean aggregators, which are order-independent so a
//! caller may parallelize the per-client work without changing the result.
//! Sampling is seeded per (run seed, round), so a resumed run draws the
//! same cohorts it would have drawn uninterrupted.

use crate::error::RunError;
use crate::executor::RoundExecutor;
use fedsim_core::aggregate::{aggregate_reports, AggregateKind};
use fedsim_core::{tensor, MetricReport, MetricValue};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Result of one client's local round.
#[derive(Debug, Clone)]
pub struct ClientUpdate {
    pub client_id: u64,
    /// Locally updated parameter vector.
    pub params: Vec<f64>,
    /// Number of local examples; the FedAvg combination weight.
    pub num_examples: u64,
    pub metrics: MetricReport,
}

/// A population of simulated clients, as the executor sees them.
pub trait ClientWorkload {
    /// Run client `client_id`'s local round from the global parameters.
    fn client_round(
        &mut self,
        client_id: u64,
        global: &[f64],
        round: u64,
    ) -> anyhow::Result<ClientUpdate>;

    /// Held-out metrics for the global parameters.
    fn evaluate(&mut self, global: &[f64]) -> anyhow::Result<MetricReport>;

    /// Metrics on a held-out test split, computed once after training.
    /// Defaults to `None` for workloads without a test split.
    fn test_evaluate(&mut self, _global: &[f64]) -> anyhow::Result<Option<MetricReport>> {
        Ok(None)
    }
}

/// The loop-visible round state of a federated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedState {
    pub params: Vec<f64>,
}

/// Drives federated rounds over a [`ClientWorkload`].
pub struct FederatedExecutor<W> {
    workload: W,
    population: u64,
    clients_per_round: usize,
    seed: u64,
}

impl<W: ClientWorkload> FederatedExecutor<W> {
    pub fn new(
        workload: W,
        population: u64,
        clients_per_round: usize,
        seed: u64,
    ) -> Result<Self, RunError> {
        if clients_per_round == 0 {
            return Err(RunError::config("clients_per_round must be positive"));
        }
        if clients_per_round as u64 > population {
            return Err(RunError::config(format!(
                "clients_per_round ({clients_per_round}) exceeds population ({population})"
            )));
        }
        Ok(Self {
            workload,
            population,
            clients_per_round,
            seed,
        })
    }

    /// Distinct client ids for `round`, deterministic per (seed, round).
    pub fn sample_clients(&self, round: u64) -> Vec<u64> {
        let mut rng = StdRng::seed_from_u64(
            self.seed ^ round.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        let mut ids: Vec<u64> =
            rand::seq::index::sample(&mut rng, self.population as usize, self.clients_per_round)
                .into_iter()
                .map(|i| i as u64)
                .collect();
        ids.sort_unstable();
        ids
    }
}

impl<W: ClientWorkload> RoundExecutor for FederatedExecutor<W> {
    type State = FederatedState;

    fn run_round(
        &mut self,
        state: FederatedState,
        round: u64,
    ) -> anyhow::Result<(FederatedState, MetricReport)> {
        let cohort = self.sample_clients(round);

        let mut updates = Vec::with_capacity(cohort.len());
        for client_id in cohort {
            updates.push(self.workload.client_round(client_id, &state.params, round)?);
        }

        let vectors: Vec<Vec<f64>> = updates.iter().map(|u| u.params.clone()).collect();
        let weights: Vec<f64> = updates.iter().map(|u| u.num_examples as f64).collect();
        let params = tensor::weighted_average(&vectors, &weights)?;

        let mut delta = params.clone();
        tensor::add_scaled(&mut delta, &state.params, -1.0)?;

        let contributions: Vec<(MetricReport, f64)> = updates
            .iter()
            .map(|u| (u.metrics.clone(), u.num_examples as f64))
            .collect();
        let mut report = aggregate_reports(&contributions, AggregateKind::WeightedMean)
            .prefixed("train");
        report.insert_scalar("num_clients", updates.len() as f64);
        report.insert_scalar("num_examples", weights.iter().sum());
        report.insert_scalar("model_delta_norm", tensor::l2_norm(&delta));

        // Per-client breakdown as a nested group.
        let mut clients = MetricReport::new();
        for update in &updates {
            clients.insert(
                format!("client_{}", update.client_id),
                MetricValue::from(update.metrics.clone()),
            );
        }
        report.insert("clients", clients);

        Ok((FederatedState { params }, report))
    }

    fn evaluate(&mut self, state: &FederatedState) -> anyhow::Result<MetricReport> {
        self.workload.evaluate(&state.params)
    }

    fn test_evaluate(&mut self, state: &FederatedState) -> anyhow::Result<Option<MetricReport>> {
        self.workload.test_evaluate(&state.params)
    }
}
