//! Checkpoint management — durable round-tagged snapshots of run state.
//!
//! One JSON envelope per retained round under `<run_dir>/checkpoints/`,
//! published atomically (tmp + rename) so a reader never observes a
//! partial record. Each envelope carries a sha256 of its serialized state;
//! an unreadable or hash-mismatched record is treated as absent and the
//! restore scan falls back to the next-older round.

use crate::error::RunError;
use chrono::{DateTime, Utc};
use fedsim_core::persistence;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CHECKPOINT_DIR: &str = "checkpoints";
const CHECKPOINT_PREFIX: &str = "round_";

/// On-disk record: opaque state plus the round it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    round: u64,
    created_at: DateTime<Utc>,
    state_sha256: String,
    state: serde_json::Value,
}

/// Summary of one retained record, for inspection tooling.
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointInfo {
    pub round: u64,
    pub created_at: DateTime<Utc>,
}

/// Manages the checkpoint records of one run directory.
pub struct CheckpointManager {
    dir: PathBuf,
    retention: usize,
}

impl CheckpointManager {
    pub fn new(run_dir: &Path, retention: usize) -> Self {
        Self {
            dir: run_dir.join(CHECKPOINT_DIR),
            retention,
        }
    }

    fn path_for(&self, round: u64) -> PathBuf {
        self.dir.join(format!("{CHECKPOINT_PREFIX}{round:08}.json"))
    }

    /// Save `state` as the record for `round`, then prune to the retention
    /// bound (oldest round index first). Saving the same round again
    /// replaces that record; at most one record exists per round.
    pub fn save<S: Serialize>(&self, state: &S, round: u64) -> Result<(), RunError> {
        let state = serde_json::to_value(state)?;
        let envelope = Envelope {
            round,
            created_at: Utc::now(),
            state_sha256: hash_state(&state)?,
            state,
        };
        persistence::atomic_write_json(&self.path_for(round), &envelope)?;
        debug!(round, "checkpoint saved");
        self.prune()?;
        Ok(())
    }

    /// Restore the newest valid record, if any.
    ///
    /// Scans retained rounds newest-first; corrupt records are logged and
    /// skipped. An empty or absent checkpoint directory is a fresh start,
    /// not an error.
    pub fn load_latest<S: DeserializeOwned>(&self) -> Result<Option<(S, u64)>, RunError> {
        for round in self.rounds()?.into_iter().rev() {
            if let Some(state) = self.read_verified(round) {
                return Ok(Some((serde_json::from_value(state)?, round)));
            }
        }
        Ok(None)
    }

    /// Restore a specific round's state; corrupt or absent → `None`.
    pub fn load_at<S: DeserializeOwned>(&self, round: u64) -> Result<Option<S>, RunError> {
        match self.read_verified(round) {
            Some(state) => Ok(Some(serde_json::from_value(state)?)),
            None => Ok(None),
        }
    }

    /// Round indices with a record on disk, ascending.
    pub fn rounds(&self) -> Result<Vec<u64>, RunError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut rounds = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(round) = parse_round(&name.to_string_lossy()) {
                rounds.push(round);
            }
        }
        rounds.sort_unstable();
        Ok(rounds)
    }

    /// Retained records with their creation times, ascending by round.
    pub fn list(&self) -> Result<Vec<CheckpointInfo>, RunError> {
        let mut records = Vec::new();
        for round in self.rounds()? {
            let envelope: Option<Envelope> = match persistence::load_json(&self.path_for(round)) {
                Ok(e) => e,
                Err(_) => continue,
            };
            if let Some(envelope) = envelope {
                records.push(CheckpointInfo {
                    round: envelope.round,
                    created_at: envelope.created_at,
                });
            }
        }
        Ok(records)
    }

    /// Read and integrity-check one record; any failure demotes it to
    /// "not found" with a warning so callers fall back to an older round.
    fn read_verified(&self, round: u64) -> Option<serde_json::Value> {
        let path = self.path_for(round);
        let envelope: Envelope = match persistence::load_json(&path) {
            Ok(Some(e)) => e,
            Ok(None) => return None,
            Err(e) => {
                warn!(round, error = %e, "unreadable checkpoint record, skipping");
                return None;
            }
        };
        match hash_state(&envelope.state) {
            Ok(hash) if hash == envelope.state_sha256 => Some(envelope.state),
            Ok(_) => {
                warn!(round, "checkpoint hash mismatch, skipping");
                None
            }
            Err(e) => {
                warn!(round, error = %e, "checkpoint hash check failed, skipping");
                None
            }
        }
    }

    /// Delete oldest-by-round records beyond the retention bound.
    fn prune(&self) -> Result<(), RunError> {
        let rounds = self.rounds()?;
        if rounds.len() <= self.retention {
            return Ok(());
        }
        let excess = rounds.len() - self.retention;
        for &round in rounds.iter().take(excess) {
            persistence::remove_if_exists(&self.path_for(round))?;
            debug!(round, "pruned checkpoint");
        }
        Ok(())
    }
}

fn hash_state(state: &serde_json::Value) -> Result<String, RunError> {
    let bytes = serde_json::to_vec(state)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn parse_round(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct State {
        params: Vec<f64>,
        round: u64,
    }

    fn state(round: u64) -> State {
        State {
            params: vec![round as f64, 1.0],
            round,
        }
    }

    #[test]
    fn test_save_then_load_latest() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);

        manager.save(&state(0), 0).unwrap();
        manager.save(&state(3), 3).unwrap();

        let (restored, round): (State, u64) = manager.load_latest().unwrap().unwrap();
        assert_eq!(round, 3);
        assert_eq!(restored, state(3));
    }

    #[test]
    fn test_load_latest_on_empty_dir_is_none() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);
        let restored: Option<(State, u64)> = manager.load_latest().unwrap();
        assert!(restored.is_none());
    }

    #[test]
    fn test_load_at_specific_round() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);
        manager.save(&state(1), 1).unwrap();
        manager.save(&state(2), 2).unwrap();

        let restored: Option<State> = manager.load_at(1).unwrap();
        assert_eq!(restored, Some(state(1)));
        let missing: Option<State> = manager.load_at(9).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_same_round_save_replaces() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);
        manager.save(&state(1), 4).unwrap();
        manager.save(&state(2), 4).unwrap();

        assert_eq!(manager.rounds().unwrap(), vec![4]);
        let restored: Option<State> = manager.load_at(4).unwrap();
        assert_eq!(restored, Some(state(2)));
    }

    #[test]
    fn test_retention_keeps_most_recent() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 2);
        for round in 0..5 {
            manager.save(&state(round), round).unwrap();
        }
        assert_eq!(manager.rounds().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_corrupt_latest_falls_back_to_older() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);
        manager.save(&state(0), 0).unwrap();
        manager.save(&state(1), 1).unwrap();

        std::fs::write(dir.path().join("checkpoints/round_00000001.json"), b"junk").unwrap();

        let (restored, round): (State, u64) = manager.load_latest().unwrap().unwrap();
        assert_eq!(round, 0);
        assert_eq!(restored, state(0));
    }

    #[test]
    fn test_hash_mismatch_treated_as_missing() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);
        manager.save(&state(2), 2).unwrap();

        // Tamper with the state but keep the envelope well-formed.
        let path = dir.path().join("checkpoints/round_00000002.json");
        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replace("2.0", "99.0");
        assert_ne!(content, tampered);
        std::fs::write(&path, tampered).unwrap();

        let restored: Option<(State, u64)> = manager.load_latest().unwrap();
        assert!(restored.is_none());
    }

    #[test]
    fn test_no_partial_record_visible() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5);
        manager.save(&state(0), 0).unwrap();

        // The publish is rename-based; no tmp sibling should survive.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("checkpoints"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
