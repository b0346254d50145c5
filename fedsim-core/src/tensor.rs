//! Parameter-vector helpers for model combination.
//!
//! Federated averaging treats a model as a flat `Vec<f64>` of parameters;
//! these are the pure functions the federated executor uses to combine
//! client results. Length mismatches are shape errors, never silent
//! truncation.

use crate::error::CoreError;

/// Example-weighted average of parameter vectors (the FedAvg combination
/// step). All vectors must share a length; the weight total must be
/// positive.
pub fn weighted_average(vectors: &[Vec<f64>], weights: &[f64]) -> Result<Vec<f64>, CoreError> {
    if vectors.is_empty() {
        return Err(CoreError::shape("no vectors to average"));
    }
    if vectors.len() != weights.len() {
        return Err(CoreError::shape(format!(
            "{} vectors but {} weights",
            vectors.len(),
            weights.len()
        )));
    }
    let dim = vectors[0].len();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(CoreError::shape("weights sum to zero"));
    }

    let mut acc = vec![0.0; dim];
    for (vector, weight) in vectors.iter().zip(weights) {
        if vector.len() != dim {
            return Err(CoreError::shape(format!(
                "vector length {} differs from {}",
                vector.len(),
                dim
            )));
        }
        add_scaled(&mut acc, vector, weight / total)?;
    }
    Ok(acc)
}

/// `acc += scale * v`, elementwise.
pub fn add_scaled(acc: &mut [f64], v: &[f64], scale: f64) -> Result<(), CoreError> {
    if acc.len() != v.len() {
        return Err(CoreError::shape(format!(
            "accumulator length {} differs from vector length {}",
            acc.len(),
            v.len()
        )));
    }
    for (a, x) in acc.iter_mut().zip(v) {
        *a += scale * x;
    }
    Ok(())
}

/// Euclidean norm; useful for update-magnitude metrics.
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub fn zeros_like(v: &[f64]) -> Vec<f64> {
    vec![0.0; v.len()]
}
