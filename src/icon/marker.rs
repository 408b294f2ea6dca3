//! "Applied by this tool" markers
//!
//! The marker is an out-of-band presence tag on a file. `SidecarMarkers`
//! keeps the tags in a JSON index of normalized paths; moving or renaming
//! a file orphans its entry.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::surface::normalize_path;
use crate::state::persist;

/// Marker capability: tag, query, untag
pub trait MarkerStore: Send + Sync {
    fn mark(&self, path: &Path) -> io::Result<()>;
    fn is_marked(&self, path: &Path) -> bool;
    fn unmark(&self, path: &Path) -> io::Result<()>;
}

/// Marker index persisted to a sidecar JSON file
#[derive(Debug)]
pub struct SidecarMarkers {
    index_file: PathBuf,
    marked: Mutex<BTreeSet<String>>,
}

impl SidecarMarkers {
    /// Open the index, starting empty if it is missing or unreadable
    pub fn open(index_file: impl Into<PathBuf>) -> Self {
        let index_file = index_file.into();
        let marked: BTreeSet<String> =
            persist::load_list::<String>(&index_file).into_iter().collect();
        Self {
            index_file,
            marked: Mutex::new(marked),
        }
    }

    fn key(path: &Path) -> String {
        normalize_path(path).to_string_lossy().into_owned()
    }

    fn write(&self, marked: &BTreeSet<String>) -> io::Result<()> {
        let list: Vec<&String> = marked.iter().collect();
        persist::write_list(&self.index_file, &list)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))
    }
}

impl MarkerStore for SidecarMarkers {
    fn mark(&self, path: &Path) -> io::Result<()> {
        let mut marked = self.marked.lock();
        if marked.insert(Self::key(path)) {
            self.write(&marked)?;
        }
        Ok(())
    }

    fn is_marked(&self, path: &Path) -> bool {
        self.marked.lock().contains(&Self::key(path))
    }

    fn unmark(&self, path: &Path) -> io::Result<()> {
        let mut marked = self.marked.lock();
        if marked.remove(&Self::key(path)) {
            self.write(&marked)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_mark_query_unmark() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a.rs");
        fs::write(&file, "fn main() {}").unwrap();

        let markers = SidecarMarkers::open(temp.path().join("markers.json"));
        assert!(!markers.is_marked(&file));

        markers.mark(&file).unwrap();
        assert!(markers.is_marked(&file));

        markers.unmark(&file).unwrap();
        assert!(!markers.is_marked(&file));
    }

    #[test]
    fn test_index_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("b.rs");
        fs::write(&file, "").unwrap();
        let index = temp.path().join("markers.json");

        SidecarMarkers::open(&index).mark(&file).unwrap();

        let reopened = SidecarMarkers::open(&index);
        assert!(reopened.is_marked(&file));
    }
}
