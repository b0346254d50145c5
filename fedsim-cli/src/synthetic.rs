//! Synthetic linear-regression task for demo runs.
//!
//! A seeded, fully deterministic least-squares problem: enough to exercise
//! resume, checkpointing, and metric history end to end without a real
//! dataset. The same generator backs both modes — centralized training
//! sees the whole training set, federated training shards it across
//! simulated clients.

use fedsim_core::MetricReport;
use fedsim_loop::{ClientUpdate, ClientWorkload, FitEvaluate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const DIM: usize = 4;
const TRUE_PARAMS: [f64; DIM + 1] = [1.5, -2.0, 0.5, 3.0, 0.25];

type Example = (Vec<f64>, f64);

/// Model parameters: `DIM` weights plus a trailing bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearState {
    pub params: Vec<f64>,
}

impl LinearState {
    pub fn zeros() -> Self {
        Self {
            params: vec![0.0; DIM + 1],
        }
    }
}

/// Draw `n` noisy examples of the fixed ground-truth linear model.
pub fn generate(seed: u64, n: usize) -> Vec<Example> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let x: Vec<f64> = (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let noise = rng.gen_range(-0.05..0.05);
            let y = predict(&TRUE_PARAMS, &x) + noise;
            (x, y)
        })
        .collect()
}

fn predict(params: &[f64], x: &[f64]) -> f64 {
    let bias = params[params.len() - 1];
    params[..params.len() - 1]
        .iter()
        .zip(x)
        .map(|(w, xi)| w * xi)
        .sum::<f64>()
        + bias
}

fn mse(params: &[f64], data: &[Example]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter()
        .map(|(x, y)| {
            let err = predict(params, x) - y;
            err * err
        })
        .sum::<f64>()
        / data.len() as f64
}

/// One full-batch gradient step on the mean-squared error.
fn gd_step(params: &mut [f64], data: &[Example], lr: f64) {
    if data.is_empty() {
        return;
    }
    let n = data.len() as f64;
    let mut grad = vec![0.0; params.len()];
    for (x, y) in data {
        let err = predict(params, x) - y;
        let Some((bias_grad, weight_grad)) = grad.split_last_mut() else {
            return;
        };
        for (g, xi) in weight_grad.iter_mut().zip(x) {
            *g += 2.0 * err * xi / n;
        }
        *bias_grad += 2.0 * err / n;
    }
    for (p, g) in params.iter_mut().zip(&grad) {
        *p -= lr * g;
    }
}

/// The centralized flavor: whole training set, one gradient pass per round.
pub struct SyntheticRegression {
    train: Vec<Example>,
    validation: Vec<Example>,
    test: Vec<Example>,
}

impl SyntheticRegression {
    pub fn new(seed: u64, train_examples: usize, holdout_examples: usize) -> Self {
        Self {
            train: generate(seed, train_examples),
            validation: generate(seed.wrapping_add(1), holdout_examples),
            test: generate(seed.wrapping_add(1 << 32), holdout_examples),
        }
    }
}

impl FitEvaluate for SyntheticRegression {
    type State = LinearState;

    fn fit_round(
        &mut self,
        mut state: LinearState,
        lr: f64,
        _round: u64,
    ) -> anyhow::Result<(LinearState, MetricReport)> {
        gd_step(&mut state.params, &self.train, lr);
        let mut metrics = MetricReport::new();
        metrics.insert_scalar("loss", mse(&state.params, &self.train));
        Ok((state, metrics))
    }

    fn evaluate(&mut self, state: &LinearState) -> anyhow::Result<MetricReport> {
        let mut metrics = MetricReport::new();
        metrics.insert_scalar("loss", mse(&state.params, &self.validation));
        Ok(metrics)
    }

    fn test_evaluate(&mut self, state: &LinearState) -> anyhow::Result<Option<MetricReport>> {
        let mut metrics = MetricReport::new();
        metrics.insert_scalar("loss", mse(&state.params, &self.test));
        Ok(Some(metrics))
    }
}

/// The federated flavor: the same problem sharded across clients, local
/// gradient steps per round, combined by the executor.
pub struct SyntheticClients {
    shards: Vec<Vec<Example>>,
    validation: Vec<Example>,
    test: Vec<Example>,
    local_steps: u32,
    client_lr: f64,
}

impl SyntheticClients {
    pub fn new(seed: u64, clients: u64, examples_per_client: usize) -> Self {
        let shards = (0..clients)
            .map(|c| generate(seed.wrapping_add(2 + c), examples_per_client))
            .collect();
        Self {
            shards,
            validation: generate(seed.wrapping_add(1), 200),
            // Offset far past the per-client shard seeds.
            test: generate(seed.wrapping_add(1 << 32), 200),
            local_steps: 5,
            client_lr: 0.1,
        }
    }
}

impl ClientWorkload for SyntheticClients {
    fn client_round(
        &mut self,
        client_id: u64,
        global: &[f64],
        _round: u64,
    ) -> anyhow::Result<ClientUpdate> {
        let shard = &self.shards[client_id as usize];
        let mut params = global.to_vec();
        for _ in 0..self.local_steps {
            gd_step(&mut params, shard, self.client_lr);
        }
        let mut metrics = MetricReport::new();
        metrics.insert_scalar("loss", mse(&params, shard));
        Ok(ClientUpdate {
            client_id,
            params,
            num_examples: shard.len() as u64,
            metrics,
        })
    }

    fn evaluate(&mut self, global: &[f64]) -> anyhow::Result<MetricReport> {
        let mut metrics = MetricReport::new();
        metrics.insert_scalar("loss", mse(global, &self.validation));
        Ok(metrics)
    }

    fn test_evaluate(&mut self, global: &[f64]) -> anyhow::Result<Option<MetricReport>> {
        let mut metrics = MetricReport::new();
        metrics.insert_scalar("loss", mse(global, &self.test));
        Ok(Some(metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate(9, 10), generate(9, 10));
        assert_ne!(generate(9, 10), generate(10, 10));
    }

    #[test]
    fn test_gradient_descent_reduces_loss() {
        let data = generate(1, 100);
        let mut params = vec![0.0; DIM + 1];
        let before = mse(&params, &data);
        for _ in 0..50 {
            gd_step(&mut params, &data, 0.1);
        }
        let after = mse(&params, &data);
        assert!(after < before / 10.0, "loss {before} -> {after}");
    }

    #[test]
    fn test_client_round_reports_shard_size() {
        let mut clients = SyntheticClients::new(3, 4, 25);
        let update = clients
            .client_round(2, &vec![0.0; DIM + 1], 0)
            .unwrap();
        assert_eq!(update.num_examples, 25);
        assert_eq!(update.params.len(), DIM + 1);
    }

    #[test]
    fn test_split_is_distinct_from_validation() {
        let mut task = SyntheticRegression::new(7, 100, 50);
        let state = LinearState::zeros();
        let val = task.evaluate(&state).unwrap();
        let test = task.test_evaluate(&state).unwrap().unwrap();
        assert_ne!(val.scalar("loss"), test.scalar("loss"));
    }
}
