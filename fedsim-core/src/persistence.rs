//! Atomic file persistence — the write path for checkpoint records and
//! metric history.
//!
//! Every durable artifact in a run directory goes through `atomic_write`:
//! serialize, write to a `.tmp` sibling, then rename over the target. A
//! reader concurrent with a crash therefore sees either the previous
//! complete record or the new complete record, never a partial one.

use crate::error::CoreError;
use std::path::Path;

/// Atomically write a value as pretty-printed JSON.
///
/// Creates parent directories if they don't exist.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write raw bytes: `.tmp` sibling first, then rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist, an error on unreadable
/// or undecodable content. Callers that want corrupt-tolerant reads (the
/// checkpoint manager's restore scan) match on the error themselves.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

/// Remove a file if present; missing files are not an error.
pub fn remove_if_exists(path: &Path) -> Result<(), CoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
