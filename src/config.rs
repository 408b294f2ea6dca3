//! On-disk layout and environment overrides
//!
//! Every persisted file lives under one data directory:
//! - Linux: ~/.local/share/IconSmith
//! - macOS: ~/Library/Application Support/IconSmith
//! - Windows: %APPDATA%\IconSmith
//!
//! | Env Var                | Default                 |
//! |------------------------|-------------------------|
//! | `ICONSMITH_DATA_DIR`   | platform data directory |
//! | `ICONSMITH_SHARED_DIR` | `<data>/shared`         |

use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of retained undo entries
pub const MAX_UNDO_ENTRIES: usize = 50;

/// Maximum number of retained activity entries
pub const MAX_ACTIVITY_ENTRIES: usize = 50;

/// Maximum number of icons published to the recent-icons channel
pub const MAX_RECENT_ICONS: usize = 10;

/// Edge length of published recent-icon thumbnails (square)
pub const THUMBNAIL_SIZE: u32 = 64;

const APP_DIR_NAME: &str = "IconSmith";

/// Resolved locations of every file and directory the crate touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
    shared_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the layout from the environment, falling back to the
    /// platform data directory.
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os("ICONSMITH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_data_dir);

        let shared_dir = std::env::var_os("ICONSMITH_SHARED_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("shared"));

        Self { data_dir, shared_dir }
    }

    /// Build a layout rooted at an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let data_dir = root.into();
        let shared_dir = data_dir.join("shared");
        Self { data_dir, shared_dir }
    }

    fn default_data_dir() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR_NAME);
        path
    }

    /// Create the directory tree. Failures are logged, not fatal.
    pub fn ensure_directories(&self) {
        let directories = [
            self.data_dir.clone(),
            self.icons_dir("bundled"),
            self.icons_dir("imported"),
            self.icons_dir("generated"),
            self.icons_dir("clipboard"),
            self.undo_dir(),
            self.surface_dir(),
            self.shared_icons_dir(),
        ];

        for dir in &directories {
            if let Err(err) = fs::create_dir_all(dir) {
                tracing::warn!(path = %dir.display(), error = %err, "failed to create directory");
            }
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn shared_dir(&self) -> &Path {
        &self.shared_dir
    }

    /// `Icons/<kind>` under the data directory
    pub fn icons_dir(&self, kind: &str) -> PathBuf {
        self.data_dir.join("Icons").join(kind)
    }

    pub fn library_file(&self) -> PathBuf {
        self.data_dir.join("library.json")
    }

    pub fn folders_file(&self) -> PathBuf {
        self.data_dir.join("folders.json")
    }

    pub fn presets_file(&self) -> PathBuf {
        self.data_dir.join("presets.json")
    }

    pub fn activity_file(&self) -> PathBuf {
        self.data_dir.join("activity.json")
    }

    pub fn undo_dir(&self) -> PathBuf {
        self.data_dir.join("undo")
    }

    /// Custom-icon storage of the sidecar icon backend
    pub fn surface_dir(&self) -> PathBuf {
        self.data_dir.join("surface")
    }

    /// Sidecar marker index
    pub fn markers_file(&self) -> PathBuf {
        self.data_dir.join("markers.json")
    }

    pub fn recent_icons_file(&self) -> PathBuf {
        self.shared_dir.join("recent-icons.json")
    }

    pub fn shared_icons_dir(&self) -> PathBuf {
        self.shared_dir.join("Icons")
    }
}
