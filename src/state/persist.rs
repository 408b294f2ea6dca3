//! JSON persistence for the record lists
//!
//! Each store is one JSON array per file, read in full at startup and
//! rewritten in full on every mutation. A rewrite goes to a temporary file
//! in the same directory that is then renamed over the store, so a crash
//! mid-write leaves the previous contents. Failures are logged and otherwise
//! swallowed: a failed load leaves the list empty, a failed save drops the
//! update.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read a JSON array, propagating errors
pub fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistError> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Write a JSON array atomically, creating the parent directory if needed
pub fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(items)?;

    let temp_path = temp_path_for(path);
    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(&data)?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}

/// Hidden sibling of `path`, unique per process
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "list".to_string());
    path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()))
}

/// Best-effort load: empty on a missing or unreadable file
pub fn load_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match read_list(path) {
        Ok(items) => items,
        Err(PersistError::Io(err)) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to load, starting empty");
            Vec::new()
        }
    }
}

/// Best-effort save: failures are logged and dropped
pub fn save_list<T: Serialize>(path: &Path, items: &[T]) {
    if let Err(err) = write_list(path, items) {
        tracing::warn!(path = %path.display(), error = %err, "failed to save");
    }
}
