//! Icon Application Service
//!
//! Applies or removes icons on single files and on batches. A batch walks
//! its files in input order, one at a time; each file's outcome is
//! independent and nothing is rolled back. The spawned variants take a
//! per-file hook that runs right before a file is touched and never for a
//! file skipped by cancellation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::marker::MarkerStore;
use super::picture::IconImage;
use super::surface::IconSurface;
use crate::error::{IconError, IconResult};
use crate::task::{self, TaskHandle};

/// Progress of a batch: files completed so far and batch size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Outcome of a batch, partitioned per file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, IconError)>,
    /// Set when the batch stopped early; unprocessed files are in neither list
    pub cancelled: bool,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total_count(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Applies and removes custom icons through the platform primitive
#[derive(Clone)]
pub struct IconService {
    surface: Arc<dyn IconSurface>,
    markers: Arc<dyn MarkerStore>,
}

impl IconService {
    pub fn new(surface: Arc<dyn IconSurface>, markers: Arc<dyn MarkerStore>) -> Self {
        Self { surface, markers }
    }

    /// Set `icon` on `file` and tag it with the marker.
    ///
    /// A marker failure does not undo the icon change.
    pub fn apply(&self, icon: &IconImage, file: &Path) -> IconResult<()> {
        if !file.exists() {
            return Err(IconError::FileNotFound(file.to_path_buf()));
        }

        if !self.surface.set_icon(file, Some(icon)) {
            return Err(IconError::ApplyFailed(file.to_path_buf()));
        }

        if let Err(err) = self.markers.mark(file) {
            tracing::debug!(path = %file.display(), error = %err, "failed to set marker");
        }
        Ok(())
    }

    /// Clear the custom icon of `file` and strip its marker
    pub fn remove(&self, file: &Path) -> IconResult<()> {
        if !file.exists() {
            return Err(IconError::FileNotFound(file.to_path_buf()));
        }

        if !self.surface.set_icon(file, None) {
            return Err(IconError::RemoveFailed(file.to_path_buf()));
        }

        if let Err(err) = self.markers.unmark(file) {
            tracing::debug!(path = %file.display(), error = %err, "failed to remove marker");
        }
        Ok(())
    }

    /// Apply `icon` to every file, reporting progress after each one
    pub fn batch_apply(
        &self,
        icon: &IconImage,
        files: &[PathBuf],
        cancel: &CancellationToken,
        progress: impl FnMut(BatchProgress),
    ) -> BatchResult {
        self.run_batch(files, cancel, |_| {}, progress, |file| self.apply(icon, file))
    }

    /// Remove custom icons from every file, reporting progress after each one
    pub fn batch_remove(
        &self,
        files: &[PathBuf],
        cancel: &CancellationToken,
        progress: impl FnMut(BatchProgress),
    ) -> BatchResult {
        self.run_batch(files, cancel, |_| {}, progress, |file| self.remove(file))
    }

    fn run_batch(
        &self,
        files: &[PathBuf],
        cancel: &CancellationToken,
        mut before_each: impl FnMut(&Path),
        mut progress: impl FnMut(BatchProgress),
        op: impl Fn(&Path) -> IconResult<()>,
    ) -> BatchResult {
        let total = files.len();
        let mut result = BatchResult::default();

        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(completed = index, total, "batch cancelled");
                result.cancelled = true;
                break;
            }

            before_each(file);
            match op(file) {
                Ok(()) => result.succeeded.push(file.clone()),
                Err(err) => {
                    tracing::warn!(path = %file.display(), error = %err, "icon operation failed");
                    result.failed.push((file.clone(), err));
                }
            }

            progress(BatchProgress {
                completed: index + 1,
                total,
            });
        }

        tracing::info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "batch finished"
        );
        result
    }

    /// Run `batch_apply` on a blocking worker thread, calling `before_each`
    /// on every file just before it is changed
    pub fn spawn_batch_apply(
        &self,
        icon: IconImage,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
        before_each: impl FnMut(&Path) + Send + 'static,
    ) -> TaskHandle<BatchProgress, BatchResult> {
        let service = self.clone();
        task::spawn(cancel, move |cancel, progress| {
            service.run_batch(&files, &cancel, before_each, |p| progress.send(p), |file| {
                service.apply(&icon, file)
            })
        })
    }

    /// Run `batch_remove` on a blocking worker thread, calling `before_each`
    /// on every file just before it is changed
    pub fn spawn_batch_remove(
        &self,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
        before_each: impl FnMut(&Path) + Send + 'static,
    ) -> TaskHandle<BatchProgress, BatchResult> {
        let service = self.clone();
        task::spawn(cancel, move |cancel, progress| {
            service.run_batch(&files, &cancel, before_each, |p| progress.send(p), |file| {
                service.remove(file)
            })
        })
    }

    pub fn has_custom_icon(&self, file: &Path) -> bool {
        self.surface.has_custom_icon(file)
    }

    pub fn has_marker(&self, file: &Path) -> bool {
        self.markers.is_marked(file)
    }

    pub fn current_icon(&self, file: &Path) -> std::io::Result<IconImage> {
        self.surface.current_icon(file)
    }

    pub fn surface(&self) -> &Arc<dyn IconSurface> {
        &self.surface
    }

    pub fn markers(&self) -> &Arc<dyn MarkerStore> {
        &self.markers
    }
}
