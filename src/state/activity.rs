//! Activity log and the recent-icons channel
//!
//! The log is append-at-head, capped, and rewritten on every append.
//! `RecentIcons` publishes the last few icons used to a shared directory
//! that the Finder extension reads.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data::{ActivityEntry, IconRecord};
use super::persist;
use crate::config::{AppPaths, MAX_ACTIVITY_ENTRIES, MAX_RECENT_ICONS, THUMBNAIL_SIZE};

/// Bounded, most-recent-first record of completed operations
#[derive(Debug)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
    file: PathBuf,
    max_entries: usize,
}

impl ActivityLog {
    pub fn open(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let mut entries: Vec<ActivityEntry> = persist::load_list(&file);
        entries.truncate(MAX_ACTIVITY_ENTRIES);
        Self {
            entries,
            file,
            max_entries: MAX_ACTIVITY_ENTRIES,
        }
    }

    /// Insert at the head, drop anything past the cap, persist
    pub fn append(&mut self, entry: ActivityEntry) {
        tracing::info!(action = ?entry.action, files = entry.file_count(), "{}", entry.summary());
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
        persist::save_list(&self.file, &self.entries);
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One entry of `recent-icons.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentIcon {
    pub id: Uuid,
    pub name: String,
    pub thumbnail_path: Option<PathBuf>,
}

/// Writer and reader of the shared recent-icons list
#[derive(Debug, Clone)]
pub struct RecentIcons {
    list_file: PathBuf,
    icons_dir: PathBuf,
}

impl RecentIcons {
    pub fn new(paths: &AppPaths) -> Self {
        Self {
            list_file: paths.recent_icons_file(),
            icons_dir: paths.shared_icons_dir(),
        }
    }

    /// The shared list, most recent first
    pub fn load(&self) -> Vec<RecentIcon> {
        persist::load_list(&self.list_file)
    }

    /// Write a thumbnail of `icon` and move it to the front of the list.
    ///
    /// Nothing is published if the icon's image cannot be read.
    pub fn publish(&self, icon: &IconRecord) {
        let thumbnail = match icon.image().and_then(|image| image.thumbnail(THUMBNAIL_SIZE)) {
            Ok(thumbnail) => thumbnail,
            Err(err) => {
                tracing::warn!(id = %icon.id, error = %err, "cannot publish recent icon");
                return;
            }
        };

        if let Err(err) = fs::create_dir_all(&self.icons_dir) {
            tracing::warn!(path = %self.icons_dir.display(), error = %err, "shared directory unavailable");
            return;
        }
        let thumbnail_path = self.icons_dir.join(format!("{}.png", icon.id));
        if let Err(err) = thumbnail.save(&thumbnail_path) {
            tracing::warn!(path = %thumbnail_path.display(), error = %err, "failed to write thumbnail");
            return;
        }

        let mut recent = self.load();
        recent.retain(|r| r.id != icon.id);
        recent.insert(
            0,
            RecentIcon {
                id: icon.id,
                name: icon.name.clone(),
                thumbnail_path: Some(thumbnail_path),
            },
        );
        recent.truncate(MAX_RECENT_ICONS);
        persist::save_list(&self.list_file, &recent);
    }
}
