//! Undo Ledger
//!
//! Entries are kept most-recent-first in `undo/stack.json`. Snapshot images
//! live next to it, one PNG per entry, named by the entry id. Undo is
//! single-step, LIFO and addressed by file path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::data::UndoEntry;
use super::persist;
use crate::config::MAX_UNDO_ENTRIES;
use crate::icon::picture::IconImage;
use crate::icon::surface::IconSurface;

pub struct UndoLedger {
    entries: Vec<UndoEntry>,
    undo_dir: PathBuf,
    max_entries: usize,
    surface: Arc<dyn IconSurface>,
}

impl UndoLedger {
    /// Load the ledger from `undo_dir/stack.json`
    pub fn open(undo_dir: impl Into<PathBuf>, surface: Arc<dyn IconSurface>) -> Self {
        let undo_dir = undo_dir.into();
        if let Err(err) = fs::create_dir_all(&undo_dir) {
            tracing::warn!(path = %undo_dir.display(), error = %err, "failed to create undo directory");
        }
        let entries = persist::load_list(&undo_dir.join("stack.json"));
        Self {
            entries,
            undo_dir,
            max_entries: MAX_UNDO_ENTRIES,
            surface,
        }
    }

    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty()
    }

    fn stack_file(&self) -> PathBuf {
        self.undo_dir.join("stack.json")
    }

    /// Snapshot `file`'s current icon. Call before an apply or remove.
    ///
    /// Files without a custom icon get an entry with no snapshot; undoing
    /// it clears the icon.
    pub fn record_before_change(&mut self, file: &Path) -> &UndoEntry {
        let id = Uuid::new_v4();
        let had_custom_icon = self.surface.has_custom_icon(file);

        let original_icon_path = if had_custom_icon {
            self.snapshot(id, file)
        } else {
            None
        };

        self.entries.insert(
            0,
            UndoEntry {
                id,
                timestamp: Utc::now(),
                file_path: file.to_path_buf(),
                had_custom_icon,
                original_icon_path,
            },
        );
        self.trim();
        self.save();

        &self.entries[0]
    }

    fn snapshot(&self, id: Uuid, file: &Path) -> Option<PathBuf> {
        let snapshot_path = self.undo_dir.join(format!("{}.png", id));
        let saved = self
            .surface
            .current_icon(file)
            .map_err(|err| err.to_string())
            .and_then(|icon| icon.save(&snapshot_path).map_err(|err| err.to_string()));

        match saved {
            Ok(()) => Some(snapshot_path),
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "failed to snapshot icon");
                None
            }
        }
    }

    fn trim(&mut self) {
        while self.entries.len() > self.max_entries {
            if let Some(evicted) = self.entries.pop() {
                remove_snapshot(&evicted);
            }
        }
    }

    /// Reverse the most recent change.
    ///
    /// Returns false when there was nothing to undo. The entry is consumed
    /// even if the platform refuses the restore (e.g. the file is gone).
    pub fn undo(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let entry = self.entries.remove(0);

        let restored = match (entry.had_custom_icon, &entry.original_icon_path) {
            (true, Some(snapshot)) => match IconImage::load(snapshot) {
                Ok(icon) => self.surface.set_icon(&entry.file_path, Some(&icon)),
                Err(err) => {
                    tracing::warn!(path = %snapshot.display(), error = %err, "snapshot unreadable");
                    false
                }
            },
            _ => self.surface.set_icon(&entry.file_path, None),
        };

        if !restored {
            tracing::debug!(path = %entry.file_path.display(), "undo restore had no effect");
        }

        remove_snapshot(&entry);
        self.save();

        tracing::info!(path = %entry.file_path.display(), "undid icon change");
        true
    }

    /// Delete every snapshot and empty the ledger
    pub fn clear_history(&mut self) {
        for entry in self.entries.drain(..) {
            remove_snapshot(&entry);
        }
        self.save();
    }

    fn save(&self) {
        persist::save_list(&self.stack_file(), &self.entries);
    }
}

fn remove_snapshot(entry: &UndoEntry) {
    if let Some(path) = &entry.original_icon_path {
        if let Err(err) = fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %err, "snapshot already gone");
        }
    }
}

impl std::fmt::Debug for UndoLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoLedger")
            .field("undo_dir", &self.undo_dir)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::picture::solid_icon;
    use crate::icon::surface::SidecarIconSurface;

    struct Fixture {
        _temp: tempfile::TempDir,
        root: PathBuf,
        surface: Arc<SidecarIconSurface>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::tempdir().unwrap();
            let root = temp.path().to_path_buf();
            let surface = Arc::new(SidecarIconSurface::new(root.join("surface")));
            Self {
                _temp: temp,
                root,
                surface,
            }
        }

        fn ledger(&self) -> UndoLedger {
            UndoLedger::open(self.root.join("undo"), self.surface.clone())
        }

        fn file(&self, name: &str) -> PathBuf {
            let path = self.root.join(name);
            fs::write(&path, name).unwrap();
            path
        }
    }

    #[test]
    fn test_entry_without_custom_icon_has_no_snapshot() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let file = fx.file("plain.txt");

        let entry = ledger.record_before_change(&file).clone();
        assert!(!entry.had_custom_icon);
        assert!(entry.original_icon_path.is_none());
    }

    #[test]
    fn test_undo_restores_snapshot() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let file = fx.file("doc.md");
        let original = solid_icon(255, 0, 0);
        fx.surface.set_icon(&file, Some(&original));

        let snapshot = ledger
            .record_before_change(&file)
            .original_icon_path
            .clone()
            .unwrap();
        assert!(snapshot.exists());

        fx.surface.set_icon(&file, Some(&solid_icon(0, 255, 0)));

        assert!(ledger.undo());
        assert_eq!(fx.surface.current_icon(&file).unwrap(), original);
        assert!(!snapshot.exists());
    }

    #[test]
    fn test_undo_without_snapshot_clears_icon() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let file = fx.file("main.rs");

        ledger.record_before_change(&file);
        fx.surface.set_icon(&file, Some(&solid_icon(3, 3, 3)));

        assert!(ledger.undo());
        assert!(!fx.surface.has_custom_icon(&file));
        assert_eq!(fx.surface.current_icon(&file).unwrap(), IconImage::placeholder_for("rs"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_undo_twice_with_one_entry() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        ledger.record_before_change(&fx.file("a.txt"));

        assert!(ledger.undo());
        assert!(!ledger.undo());
    }

    #[test]
    fn test_undo_on_deleted_file_still_consumes_entry() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let file = fx.file("temp.log");
        ledger.record_before_change(&file);
        fs::remove_file(&file).unwrap();

        assert!(ledger.undo());
        assert!(!ledger.can_undo());
    }

    #[test]
    fn test_ledger_keeps_fifty_most_recent_and_deletes_evicted_snapshots() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let total = MAX_UNDO_ENTRIES + 7;

        let mut snapshots = Vec::new();
        let mut files = Vec::new();
        for i in 0..total {
            let file = fx.file(&format!("f{i}.png"));
            fx.surface.set_icon(&file, Some(&solid_icon(i as u8, 0, 0)));
            let entry = ledger.record_before_change(&file);
            snapshots.push(entry.original_icon_path.clone().unwrap());
            files.push(file);
        }

        assert_eq!(ledger.len(), MAX_UNDO_ENTRIES);
        // Most recent first
        assert_eq!(ledger.entries()[0].file_path, files[total - 1]);
        assert_eq!(ledger.entries()[MAX_UNDO_ENTRIES - 1].file_path, files[7]);

        for evicted in &snapshots[..7] {
            assert!(!evicted.exists());
        }
        for kept in &snapshots[7..] {
            assert!(kept.exists());
        }
    }

    #[test]
    fn test_clear_history_deletes_snapshots() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let file = fx.file("x.svg");
        fx.surface.set_icon(&file, Some(&solid_icon(1, 2, 3)));
        let snapshot = ledger
            .record_before_change(&file)
            .original_icon_path
            .clone()
            .unwrap();

        ledger.clear_history();
        assert!(ledger.is_empty());
        assert!(!snapshot.exists());
        assert!(fx.ledger().is_empty());
    }

    #[test]
    fn test_ledger_persists() {
        let fx = Fixture::new();
        let file = fx.file("keep.txt");
        fx.ledger().record_before_change(&file);

        let reopened = fx.ledger();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.entries()[0].file_path, file);
    }
}
