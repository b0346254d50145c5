//! Metric value model — the fixed-shape report produced once per round.
//!
//! Round and evaluation callbacks hand back a [`MetricReport`]: string keys
//! mapped to scalars or to nested groups (used for per-client breakdowns in
//! federated rounds). The shape is validated at the boundary instead of
//! accepting arbitrary structures; the `/` character is reserved in keys
//! because [`MetricReport::flatten`] uses it to join nested names into the
//! `train/loss`-style column names the metric history records.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single metric entry: a scalar or a nested group of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Group(BTreeMap<String, MetricValue>),
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<MetricReport> for MetricValue {
    fn from(report: MetricReport) -> Self {
        Self::Group(report.entries)
    }
}

/// An ordered mapping from metric name to value, produced once per round.
///
/// Ephemeral: consumed immediately by the metrics manager and by
/// aggregators, never persisted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricReport {
    entries: BTreeMap<String, MetricValue>,
}

impl MetricReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert any metric value under `key`, replacing a prior entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert a scalar under `key`.
    pub fn insert_scalar(&mut self, key: impl Into<String>, value: f64) {
        self.insert(key, MetricValue::Scalar(value));
    }

    /// Look up a top-level scalar by key.
    pub fn scalar(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(MetricValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the boundary contract: no empty keys, no `/` in keys (it is
    /// the flatten separator).
    pub fn validate(&self) -> Result<(), CoreError> {
        fn check(entries: &BTreeMap<String, MetricValue>) -> Result<(), CoreError> {
            for (key, value) in entries {
                if key.is_empty() {
                    return Err(CoreError::invalid_metric("empty metric key"));
                }
                if key.contains('/') {
                    return Err(CoreError::invalid_metric(format!(
                        "metric key '{key}' contains reserved separator '/'"
                    )));
                }
                if let MetricValue::Group(inner) = value {
                    check(inner)?;
                }
            }
            Ok(())
        }
        check(&self.entries)
    }

    /// Flatten nested groups into `parent/child` scalar columns.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        fn walk(prefix: &str, entries: &BTreeMap<String, MetricValue>, out: &mut BTreeMap<String, f64>) {
            for (key, value) in entries {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}/{key}")
                };
                match value {
                    MetricValue::Scalar(v) => {
                        out.insert(name, *v);
                    }
                    MetricValue::Group(inner) => walk(&name, inner, out),
                }
            }
        }
        let mut out = BTreeMap::new();
        walk("", &self.entries, &mut out);
        out
    }

    /// Wrap this report in a single named group, so `loss` becomes
    /// `train/loss` after flattening when prefixed with `train`.
    pub fn prefixed(self, prefix: impl Into<String>) -> Self {
        let mut outer = Self::new();
        outer.insert(prefix, MetricValue::Group(self.entries));
        outer
    }

    /// Merge another report's top-level entries into this one; keys in
    /// `other` win on conflict.
    pub fn extend(&mut self, other: MetricReport) {
        self.entries.extend(other.entries);
    }
}

impl FromIterator<(String, f64)> for MetricReport {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut report = Self::new();
        for (k, v) in iter {
            report.insert_scalar(k, v);
        }
        report
    }
}
