use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::data::ScanFolder;
use super::persist;

/// Folders kept for repeated scanning (`folders.json`)
#[derive(Debug)]
pub struct FolderList {
    folders: Vec<ScanFolder>,
    file: PathBuf,
}

impl FolderList {
    pub fn open(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let folders = persist::load_list(&file);
        Self { folders, file }
    }

    pub fn list(&self) -> &[ScanFolder] {
        &self.folders
    }

    pub fn get(&self, id: Uuid) -> Option<&ScanFolder> {
        self.folders.iter().find(|f| f.id == id)
    }

    /// Track `path`. Anything that is not a directory is ignored.
    pub fn add(&mut self, path: &Path) -> Option<&ScanFolder> {
        if !path.is_dir() {
            tracing::debug!(path = %path.display(), "not a directory, ignoring");
            return None;
        }
        self.folders.push(ScanFolder::new(path.to_path_buf()));
        self.save();
        self.folders.last()
    }

    pub fn remove(&mut self, id: Uuid) {
        self.folders.retain(|f| f.id != id);
        self.save();
    }

    /// Record the outcome of a completed scan
    pub fn mark_scanned(&mut self, id: Uuid, file_count: usize) {
        if let Some(folder) = self.folders.iter_mut().find(|f| f.id == id) {
            folder.last_scanned = Some(Utc::now());
            folder.file_count = Some(file_count);
            self.save();
        }
    }

    fn save(&self) {
        persist::save_list(&self.file, &self.folders);
    }
}
