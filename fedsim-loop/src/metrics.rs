//! Metric history management — the per-run scalar sink.
//!
//! A run directory gets `run.json` metadata on first use and an
//! append-style scalar history under `logs/scalars.json`, persisted as a
//! whole-history atomic snapshot after every log call. Reopening an
//! existing run directory reloads the history without truncating it;
//! re-logging a round merges per key, overwriting that round's prior
//! values instead of duplicating entries (resumed runs re-emit the round
//! whose checkpoint they restored next to).
//!
//! NaN scalars (the aggregators' "no data" sentinel) are stored as JSON
//! `null` and come back as NaN.

use crate::error::RunError;
use chrono::{DateTime, Utc};
use fedsim_core::persistence;
use fedsim_core::MetricReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const RUN_METADATA_FILE: &str = "run.json";
const LOGS_DIR: &str = "logs";
const SCALARS_FILE: &str = "scalars.json";

/// Identity of a run directory, created once and stable across reopens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Tabular view of a run's metric history: one row per round, columns the
/// sorted union of metric names, `None` where a round lacks a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsFrame {
    pub columns: Vec<String>,
    pub rows: Vec<(u64, Vec<Option<f64>>)>,
}

/// Process-wide metric sink for one run directory.
pub struct MetricsManager {
    scalars_path: PathBuf,
    metadata: RunMetadata,
    history: BTreeMap<u64, BTreeMap<String, f64>>,
}

impl MetricsManager {
    /// Open (or create) the metric history of `run_dir`.
    pub fn open(run_dir: &Path) -> Result<Self, RunError> {
        let metadata_path = run_dir.join(RUN_METADATA_FILE);
        let metadata = match persistence::load_json::<RunMetadata>(&metadata_path)? {
            Some(existing) => existing,
            None => {
                let fresh = RunMetadata {
                    id: uuid::Uuid::new_v4().to_string(),
                    created_at: Utc::now(),
                };
                persistence::atomic_write_json(&metadata_path, &fresh)?;
                fresh
            }
        };

        let scalars_path = run_dir.join(LOGS_DIR).join(SCALARS_FILE);
        let on_disk: Option<BTreeMap<u64, BTreeMap<String, Option<f64>>>> =
            persistence::load_json(&scalars_path)?;
        let history = on_disk.map(history_from_disk).unwrap_or_default();

        Ok(Self {
            scalars_path,
            metadata,
            history,
        })
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Record a round's metrics: validate, flatten nested groups into
    /// `a/b` columns, merge into that round's row (per-key overwrite on
    /// re-emission), and persist the history atomically.
    pub fn log_scalars(&mut self, round: u64, report: &MetricReport) -> Result<(), RunError> {
        report.validate()?;
        let flat = report.flatten();
        debug!(round, metrics = flat.len(), "logging scalars");
        self.history.entry(round).or_default().extend(flat);
        persistence::atomic_write_json(&self.scalars_path, &history_to_disk(&self.history))?;
        Ok(())
    }

    /// Highest round with any logged metric.
    pub fn latest_round(&self) -> Option<u64> {
        self.history.keys().next_back().copied()
    }

    pub fn history(&self) -> &BTreeMap<u64, BTreeMap<String, f64>> {
        &self.history
    }

    /// The `as_dataframe` view of the history.
    pub fn frame(&self) -> MetricsFrame {
        let mut columns: Vec<String> = self
            .history
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect();
        columns.sort();
        columns.dedup();

        let rows = self
            .history
            .iter()
            .map(|(&round, row)| {
                let values = columns.iter().map(|c| row.get(c).copied()).collect();
                (round, values)
            })
            .collect();

        MetricsFrame { columns, rows }
    }
}

// JSON has no NaN; the sentinel travels as null.
fn history_to_disk(
    history: &BTreeMap<u64, BTreeMap<String, f64>>,
) -> BTreeMap<u64, BTreeMap<String, Option<f64>>> {
    history
        .iter()
        .map(|(&round, row)| {
            let row = row
                .iter()
                .map(|(k, &v)| (k.clone(), if v.is_nan() { None } else { Some(v) }))
                .collect();
            (round, row)
        })
        .collect()
}

fn history_from_disk(
    on_disk: BTreeMap<u64, BTreeMap<String, Option<f64>>>,
) -> BTreeMap<u64, BTreeMap<String, f64>> {
    on_disk
        .into_iter()
        .map(|(round, row)| {
            let row = row
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
                .collect();
            (round, row)
        })
        .collect()
}
