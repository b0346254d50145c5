//! # fedsim-core — metric, aggregation, and persistence primitives
//!
//! Leaf utilities shared by the fedsim training-loop crates:
//!
//! - [`metric`] — the fixed-shape metric value model produced by round and
//!   evaluation callbacks and consumed by the metrics manager.
//! - [`aggregate`] — order-independent accumulators for combining
//!   per-client contributions into round-level statistics.
//! - [`tensor`] — parameter-vector helpers (weighted averaging and
//!   friends) used by federated model combination.
//! - [`persistence`] — atomic file writes backing checkpoint records and
//!   metric history.

pub mod aggregate;
pub mod error;
pub mod metric;
pub mod persistence;
pub mod tensor;

pub use aggregate::{AggregateKind, Aggregator};
pub use error::CoreError;
pub use metric::{MetricReport, MetricValue};
