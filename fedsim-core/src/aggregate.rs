//! Order-independent aggregation of per-client contributions.
//!
//! An [`Aggregator`] is a stateful accumulator built from an
//! [`AggregateKind`]. Its internal state is a commutative monoid (running
//! sums and counts), so `add` / `add_weighted` / `merge` commute:
//! accumulating a multiset of contributions in any order, or accumulating
//! disjoint partitions independently and merging them, produces the same
//! result up to floating-point summation order. Bit-level summation-order
//! sensitivity is accepted nondeterminism; statistically the result is
//! order-free, which is what lets callers fan client work out in parallel.

use crate::error::CoreError;
use crate::metric::MetricReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The combination a factory-built aggregator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Sum of values; weights ignored.
    Sum,
    /// Unweighted arithmetic mean.
    Mean,
    /// Mean weighted by each contribution's weight.
    WeightedMean,
    /// Number of contributions; values and weights ignored.
    Count,
}

/// A stateful accumulator for one metric.
///
/// Reset between rounds; never shared across rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregator {
    kind: AggregateKind,
    value_sum: f64,
    weighted_sum: f64,
    weight_total: f64,
    count: u64,
}

impl Aggregator {
    /// Factory: build an accumulator for `kind` with empty state.
    pub fn new(kind: AggregateKind) -> Self {
        Self {
            kind,
            value_sum: 0.0,
            weighted_sum: 0.0,
            weight_total: 0.0,
            count: 0,
        }
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    /// Incorporate one contribution with weight 1.
    pub fn add(&mut self, value: f64) {
        self.add_weighted(value, 1.0);
    }

    /// Incorporate one weighted contribution.
    pub fn add_weighted(&mut self, value: f64, weight: f64) {
        self.value_sum += value;
        self.weighted_sum += value * weight;
        self.weight_total += weight;
        self.count += 1;
    }

    /// Fold another accumulator's state into this one. Equivalent to
    /// having added the other's contributions here directly. Both
    /// accumulators must share a kind; a mismatch is an error rather
    /// than a silently wrong result.
    pub fn merge(&mut self, other: &Aggregator) -> Result<(), CoreError> {
        if self.kind != other.kind {
            return Err(CoreError::shape(format!(
                "cannot merge {:?} aggregator into {:?}",
                other.kind, self.kind
            )));
        }
        self.value_sum += other.value_sum;
        self.weighted_sum += other.weighted_sum;
        self.weight_total += other.weight_total;
        self.count += other.count;
        Ok(())
    }

    /// Current combined value; non-destructive.
    ///
    /// A mean over zero contributions, or a weighted mean whose weights
    /// total zero, returns `f64::NAN` — the documented "no data" sentinel.
    /// Never divides by zero.
    pub fn result(&self) -> f64 {
        match self.kind {
            AggregateKind::Sum => self.value_sum,
            AggregateKind::Count => self.count as f64,
            AggregateKind::Mean => {
                if self.count == 0 {
                    f64::NAN
                } else {
                    self.value_sum / self.count as f64
                }
            }
            AggregateKind::WeightedMean => {
                if self.weight_total == 0.0 {
                    f64::NAN
                } else {
                    self.weighted_sum / self.weight_total
                }
            }
        }
    }

    /// Clear state for reuse in the next round.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }
}

/// Combine many flattened reports into one, aggregating each metric name
/// with `kind` and weighting each report by its paired weight.
///
/// Used by federated rounds to fold per-client metrics into round-level
/// statistics; a metric missing from some clients is aggregated over the
/// clients that reported it.
pub fn aggregate_reports(
    contributions: &[(MetricReport, f64)],
    kind: AggregateKind,
) -> MetricReport {
    let mut accumulators: BTreeMap<String, Aggregator> = BTreeMap::new();
    for (report, weight) in contributions {
        for (name, value) in report.flatten() {
            accumulators
                .entry(name)
                .or_insert_with(|| Aggregator::new(kind))
                .add_weighted(value, *weight);
        }
    }
    accumulators
        .into_iter()
        .map(|(name, acc)| (name, acc.result()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_count() {
        let mut sum = Aggregator::new(AggregateKind::Sum);
        let mut count = Aggregator::new(AggregateKind::Count);
        for v in [1.0, 2.0, 4.0] {
            sum.add(v);
            count.add(v);
        }
        assert_eq!(sum.result(), 7.0);
        assert_eq!(count.result(), 3.0);
    }

    #[test]
    fn test_weighted_mean() {
        let mut acc = Aggregator::new(AggregateKind::WeightedMean);
        acc.add_weighted(1.0, 3.0);
        acc.add_weighted(5.0, 1.0);
        assert!((acc.result() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_mean_is_nan_not_panic() {
        let mut acc = Aggregator::new(AggregateKind::WeightedMean);
        acc.add_weighted(1.0, 0.0);
        acc.add_weighted(2.0, 0.0);
        assert!(acc.result().is_nan());

        let empty = Aggregator::new(AggregateKind::Mean);
        assert!(empty.result().is_nan());
    }

    #[test]
    fn test_merge_equals_sequential() {
        let contributions = [(1.0, 2.0), (3.0, 1.0), (5.0, 4.0), (2.0, 0.5)];

        let mut sequential = Aggregator::new(AggregateKind::WeightedMean);
        for (v, w) in contributions {
            sequential.add_weighted(v, w);
        }

        let mut left = Aggregator::new(AggregateKind::WeightedMean);
        let mut right = Aggregator::new(AggregateKind::WeightedMean);
        left.add_weighted(1.0, 2.0);
        left.add_weighted(3.0, 1.0);
        right.add_weighted(5.0, 4.0);
        right.add_weighted(2.0, 0.5);
        left.merge(&right).unwrap();

        assert!((sequential.result() - left.result()).abs() < 1e-12);
    }

    #[test]
    fn test_merge_rejects_kind_mismatch() {
        let mut sum = Aggregator::new(AggregateKind::Sum);
        sum.add(1.0);
        let mut mean = Aggregator::new(AggregateKind::Mean);
        mean.add(2.0);

        assert!(matches!(sum.merge(&mean), Err(CoreError::Shape(_))));
        // The failed merge left the receiver untouched.
        assert_eq!(sum.result(), 1.0);
    }

    #[test]
    fn test_result_is_non_destructive_and_reset_clears() {
        let mut acc = Aggregator::new(AggregateKind::Sum);
        acc.add(2.0);
        assert_eq!(acc.result(), 2.0);
        assert_eq!(acc.result(), 2.0);

        acc.reset();
        assert_eq!(acc.result(), 0.0);
    }

    #[test]
    fn test_aggregate_reports_weighted_by_examples() {
        let mut a = MetricReport::new();
        a.insert_scalar("loss", 1.0);
        let mut b = MetricReport::new();
        b.insert_scalar("loss", 3.0);

        let combined = aggregate_reports(&[(a, 10.0), (b, 30.0)], AggregateKind::WeightedMean);
        assert!((combined.scalar("loss").unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_reports_tolerates_missing_metrics() {
        let mut a = MetricReport::new();
        a.insert_scalar("loss", 1.0);
        a.insert_scalar("accuracy", 0.8);
        let mut b = MetricReport::new();
        b.insert_scalar("loss", 2.0);

        let combined = aggregate_reports(&[(a, 1.0), (b, 1.0)], AggregateKind::WeightedMean);
        assert!((combined.scalar("loss").unwrap() - 1.5).abs() < 1e-12);
        assert!((combined.scalar("accuracy").unwrap() - 0.8).abs() < 1e-12);
    }
}
