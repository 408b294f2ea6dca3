//! The OS icon primitive
//!
//! `IconSurface` is the seam between the crate and whatever the platform
//! uses to show a custom icon for a file. `SidecarIconSurface` is the
//! portable backend: custom icons are PNG files in a managed directory,
//! keyed by the SHA-256 of the target's normalized path.
//!
//! A missing file keeps the key it had while it existed, as long as its
//! parent directory is still there. Any change requested for a missing file
//! is refused, but its leftover sidecar is deleted. A file that is deleted
//! or moved and never touched again keeps its sidecar.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::picture::{Fingerprint, IconImage};

/// Platform icon primitive
pub trait IconSurface: Send + Sync {
    /// The icon currently displayed for `path`: the custom icon if one is
    /// set, otherwise the default icon for the file's type.
    fn current_icon(&self, path: &Path) -> io::Result<IconImage>;

    /// Whether `path` carries custom icon storage of nonzero size
    fn has_custom_icon(&self, path: &Path) -> bool;

    /// Set (`Some`) or clear (`None`) the custom icon of `path`.
    ///
    /// Returns false when the platform refuses the change.
    fn set_icon(&self, path: &Path, icon: Option<&IconImage>) -> bool;
}

/// Normalize a path for use as a lookup key.
///
/// Existing paths are canonicalized. A missing file is its canonical parent
/// joined with its name, so a deleted file normalizes the way it did before.
/// Anything else is only made absolute.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Lowercased suffix after the last dot, empty if there is none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Custom icons stored as sidecar PNG files
#[derive(Debug, Clone)]
pub struct SidecarIconSurface {
    store_dir: PathBuf,
}

impl SidecarIconSurface {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
        }
    }

    fn icon_path(&self, path: &Path) -> PathBuf {
        let key = normalize_path(path);
        let digest = Fingerprint::of(key.to_string_lossy().as_bytes());
        self.store_dir.join(format!("{}.png", digest.as_str()))
    }
}

impl IconSurface for SidecarIconSurface {
    fn current_icon(&self, path: &Path) -> io::Result<IconImage> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
        }

        let sidecar = self.icon_path(path);
        match fs::read(&sidecar) {
            Ok(data) if !data.is_empty() => IconImage::from_bytes(data)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string())),
            Ok(_) => Ok(IconImage::placeholder_for(&extension_of(path))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Ok(IconImage::placeholder_for(&extension_of(path)))
            }
            Err(err) => Err(err),
        }
    }

    fn has_custom_icon(&self, path: &Path) -> bool {
        fs::metadata(self.icon_path(path))
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    fn set_icon(&self, path: &Path, icon: Option<&IconImage>) -> bool {
        let sidecar = self.icon_path(path);
        if !path.is_file() {
            if !path.exists() && fs::remove_file(&sidecar).is_ok() {
                tracing::debug!(path = %path.display(), "dropped sidecar of missing file");
            }
            return false;
        }

        match icon {
            Some(icon) => {
                if let Err(err) = fs::create_dir_all(&self.store_dir) {
                    tracing::warn!(path = %self.store_dir.display(), error = %err, "icon store unavailable");
                    return false;
                }
                fs::write(&sidecar, icon.png_bytes()).is_ok()
            }
            None => match fs::remove_file(&sidecar) {
                Ok(()) => true,
                Err(err) => err.kind() == io::ErrorKind::NotFound,
            },
        }
    }
}
