//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use fedsim_core::aggregate::{AggregateKind, Aggregator};
use fedsim_core::tensor;

const TOL: f64 = 1e-9;

fn relative_close(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    (a - b).abs() <= TOL * (1.0 + a.abs().max(b.abs()))
}

fn contribution() -> impl Strategy<Value = (f64, f64)> {
    (-1e6f64..1e6, 0.0f64..1e3)
}

// --- Aggregator order-independence ---

proptest! {
    #[test]
    fn aggregation_is_permutation_invariant(
        contributions in prop::collection::vec(contribution(), 0..40),
        kind in prop_oneof![
            Just(AggregateKind::Sum),
            Just(AggregateKind::Mean),
            Just(AggregateKind::WeightedMean),
            Just(AggregateKind::Count),
        ],
    ) {
        let mut forward = Aggregator::new(kind);
        for &(v, w) in &contributions {
            forward.add_weighted(v, w);
        }

        let mut reversed = Aggregator::new(kind);
        for &(v, w) in contributions.iter().rev() {
            reversed.add_weighted(v, w);
        }

        prop_assert!(relative_close(forward.result(), reversed.result()));
    }

    #[test]
    fn merged_partitions_equal_concatenation(
        left in prop::collection::vec(contribution(), 0..20),
        right in prop::collection::vec(contribution(), 0..20),
    ) {
        let mut sequential = Aggregator::new(AggregateKind::WeightedMean);
        for &(v, w) in left.iter().chain(&right) {
            sequential.add_weighted(v, w);
        }

        let mut a = Aggregator::new(AggregateKind::WeightedMean);
        let mut b = Aggregator::new(AggregateKind::WeightedMean);
        for &(v, w) in &left {
            a.add_weighted(v, w);
        }
        for &(v, w) in &right {
            b.add_weighted(v, w);
        }
        a.merge(&b).unwrap();

        prop_assert!(relative_close(sequential.result(), a.result()));
    }

    #[test]
    fn zero_weights_never_divide(
        values in prop::collection::vec(-1e6f64..1e6, 1..20),
    ) {
        let mut acc = Aggregator::new(AggregateKind::WeightedMean);
        for &v in &values {
            acc.add_weighted(v, 0.0);
        }
        prop_assert!(acc.result().is_nan());
    }

    #[test]
    fn count_ignores_values_and_weights(
        contributions in prop::collection::vec(contribution(), 0..40),
    ) {
        let mut acc = Aggregator::new(AggregateKind::Count);
        for &(v, w) in &contributions {
            acc.add_weighted(v, w);
        }
        prop_assert_eq!(acc.result(), contributions.len() as f64);
    }
}

// --- Tensor combination properties ---

proptest! {
    #[test]
    fn weighted_average_of_identical_vectors_is_identity(
        vector in prop::collection::vec(-1e3f64..1e3, 1..16),
        weights in prop::collection::vec(0.1f64..10.0, 1..8),
    ) {
        let vectors: Vec<Vec<f64>> = weights.iter().map(|_| vector.clone()).collect();
        let averaged = tensor::weighted_average(&vectors, &weights).unwrap();
        for (a, b) in averaged.iter().zip(&vector) {
            prop_assert!(relative_close(*a, *b));
        }
    }

    #[test]
    fn weighted_average_is_weight_scale_invariant(
        vectors in prop::collection::vec(
            prop::collection::vec(-1e3f64..1e3, 4),
            1..8,
        ),
        weights_seed in prop::collection::vec(0.1f64..10.0, 8),
        scale in 0.5f64..100.0,
    ) {
        let weights: Vec<f64> = weights_seed[..vectors.len()].to_vec();
        let scaled: Vec<f64> = weights.iter().map(|w| w * scale).collect();

        let base = tensor::weighted_average(&vectors, &weights).unwrap();
        let rescaled = tensor::weighted_average(&vectors, &scaled).unwrap();
        for (a, b) in base.iter().zip(&rescaled) {
            prop_assert!(relative_close(*a, *b));
        }
    }
}
