/// Folder scanning module
///
/// This module handles:
/// - Walking a folder and describing each file's icon (mod.rs)
/// - Finding files whose icon deviates from their type's norm (detector.rs)

pub mod detector;

pub use detector::{detect_inconsistencies, Inconsistency};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use walkdir::{DirEntry, WalkDir};

use crate::icon::marker::MarkerStore;
use crate::icon::surface::{extension_of, IconSurface};
use crate::state::data::FileRecord;
use crate::task::{self, TaskHandle};

/// Directory suffixes treated as opaque bundles: never descended into
const PACKAGE_EXTENSIONS: &[&str] = &[
    "app",
    "bundle",
    "framework",
    "plugin",
    "kext",
    "pkg",
    "xcodeproj",
    "xcworkspace",
    "photoslibrary",
    "playground",
    "rtfd",
    "xcassets",
];

/// Walks folders and produces a `FileRecord` per regular file
#[derive(Clone)]
pub struct FolderScanner {
    surface: Arc<dyn IconSurface>,
    markers: Arc<dyn MarkerStore>,
}

impl FolderScanner {
    pub fn new(surface: Arc<dyn IconSurface>, markers: Arc<dyn MarkerStore>) -> Self {
        Self { surface, markers }
    }

    /// Scan `root`, optionally keeping only the given (lowercase) extensions.
    ///
    /// Hidden entries and bundle directories are skipped, symlinks are not
    /// followed, and unreadable files are skipped. `progress` receives the
    /// running file count. The walk stops between files once `cancel` is set.
    pub fn scan(
        &self,
        root: &Path,
        extensions: Option<&HashSet<String>>,
        cancel: &CancellationToken,
        mut progress: impl FnMut(usize),
    ) -> Vec<FileRecord> {
        tracing::info!(root = %root.display(), "scanning folder");

        let mut results = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || (!is_hidden(entry) && !is_package(entry)));

        for entry in walker {
            if cancel.is_cancelled() {
                tracing::info!(count = results.len(), "scan cancelled");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let extension = extension_of(path);
            if let Some(filter) = extensions {
                if !filter.contains(&extension) {
                    continue;
                }
            }

            let Some(record) = self.describe(path, extension) else {
                continue;
            };
            results.push(record);
            progress(results.len());
        }

        tracing::info!(root = %root.display(), count = results.len(), "scan complete");
        results
    }

    fn describe(&self, path: &Path, extension: String) -> Option<FileRecord> {
        let icon = match self.surface.current_icon(path) {
            Ok(icon) => icon,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping file");
                return None;
            }
        };

        Some(FileRecord {
            path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            extension,
            fingerprint: icon.fingerprint(),
            icon,
            has_custom_icon: self.surface.has_custom_icon(path),
            has_marker: self.markers.is_marked(path),
        })
    }

    /// Run `scan` on a blocking worker thread
    pub fn spawn_scan(
        &self,
        root: PathBuf,
        extensions: Option<HashSet<String>>,
        cancel: CancellationToken,
    ) -> TaskHandle<usize, Vec<FileRecord>> {
        let scanner = self.clone();
        task::spawn(cancel, move |cancel, progress| {
            scanner.scan(&root, extensions.as_ref(), &cancel, |count| progress.send(count))
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_package(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && PACKAGE_EXTENSIONS.contains(&extension_of(entry.path()).as_str())
}
