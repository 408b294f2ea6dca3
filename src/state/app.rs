//! Application state
//!
//! `AppState` is the single owner of every in-memory list. Workflows run
//! their file work on the blocking pool and fold progress back in here, so
//! nothing else mutates the lists. The one exception is the undo ledger,
//! which a running batch shares so it can snapshot each file right before
//! changing it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::activity::{ActivityLog, RecentIcons};
use super::data::{ActionKind, ActivityEntry, FileRecord, IconCategory, IconRecord};
use super::folders::FolderList;
use super::library::IconLibrary;
use super::presets::PresetList;
use super::undo::UndoLedger;
use crate::config::AppPaths;
use crate::deeplink;
use crate::error::{AppError, AppResult};
use crate::icon::clipboard::ClipboardSource;
use crate::icon::surface::normalize_path;
use crate::icon::{
    BatchProgress, BatchResult, IconImage, IconService, IconSurface, MarkerStore, SidecarIconSurface,
    SidecarMarkers,
};
use crate::scan::{FolderScanner, Inconsistency};
use crate::task::TaskHandle;

/// The one operation allowed in flight
#[derive(Debug, Clone)]
pub struct OperationProgress {
    pub name: String,
    pub current: usize,
    /// Zero when the size is not known up front (scans)
    pub total: usize,
    cancel: CancellationToken,
}

impl OperationProgress {
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| self.current as f64 / self.total as f64)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub struct AppState {
    paths: AppPaths,
    library: IconLibrary,
    folders: FolderList,
    presets: PresetList,
    activity: ActivityLog,
    undo: Arc<Mutex<UndoLedger>>,
    recent: RecentIcons,
    icons: IconService,
    scanner: FolderScanner,
    pending_files: Vec<PathBuf>,
    current_operation: Option<OperationProgress>,
}

impl AppState {
    /// Load every list from `paths`, using the sidecar icon and marker backends
    pub fn open(paths: AppPaths) -> Self {
        let surface = Arc::new(SidecarIconSurface::new(paths.surface_dir()));
        let markers = Arc::new(SidecarMarkers::open(paths.markers_file()));
        Self::with_backends(paths, surface, markers)
    }

    pub fn with_backends(
        paths: AppPaths,
        surface: Arc<dyn IconSurface>,
        markers: Arc<dyn MarkerStore>,
    ) -> Self {
        paths.ensure_directories();

        let state = Self {
            library: IconLibrary::open(&paths),
            folders: FolderList::open(paths.folders_file()),
            presets: PresetList::open(paths.presets_file()),
            activity: ActivityLog::open(paths.activity_file()),
            undo: Arc::new(Mutex::new(UndoLedger::open(paths.undo_dir(), surface.clone()))),
            recent: RecentIcons::new(&paths),
            icons: IconService::new(surface.clone(), markers.clone()),
            scanner: FolderScanner::new(surface, markers),
            pending_files: Vec::new(),
            current_operation: None,
            paths,
        };

        tracing::info!(
            icons = state.library.len(),
            presets = state.presets.list().len(),
            folders = state.folders.list().len(),
            undo = state.undo.lock().len(),
            "state loaded"
        );
        state
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn library(&self) -> &IconLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut IconLibrary {
        &mut self.library
    }

    pub fn folders(&self) -> &FolderList {
        &self.folders
    }

    pub fn folders_mut(&mut self) -> &mut FolderList {
        &mut self.folders
    }

    pub fn presets(&self) -> &PresetList {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut PresetList {
        &mut self.presets
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn undo_ledger(&self) -> MutexGuard<'_, UndoLedger> {
        self.undo.lock()
    }

    pub fn recent_icons(&self) -> &RecentIcons {
        &self.recent
    }

    pub fn icon_service(&self) -> &IconService {
        &self.icons
    }

    // ---- operation tracking ----

    pub fn current_operation(&self) -> Option<&OperationProgress> {
        self.current_operation.as_ref()
    }

    /// Mark an operation as started. Fails if another one is still running.
    pub fn begin_operation(
        &mut self,
        name: impl Into<String>,
        total: usize,
        cancel: CancellationToken,
    ) -> AppResult<()> {
        if let Some(running) = &self.current_operation {
            return Err(AppError::OperationInProgress(running.name.clone()));
        }
        let name = name.into();
        tracing::debug!(operation = %name, total, "operation started");
        self.current_operation = Some(OperationProgress {
            name,
            current: 0,
            total,
            cancel,
        });
        Ok(())
    }

    pub fn update_progress(&mut self, current: usize) {
        if let Some(op) = &mut self.current_operation {
            op.current = current;
        }
    }

    pub fn end_operation(&mut self) {
        if let Some(op) = self.current_operation.take() {
            tracing::debug!(operation = %op.name, current = op.current, "operation ended");
        }
    }

    /// Ask the running operation to stop before its next file
    pub fn cancel_current_operation(&mut self) {
        if let Some(op) = &self.current_operation {
            tracing::info!(operation = %op.name, "cancelling operation");
            op.cancel.cancel();
        }
    }

    // ---- workflows ----

    /// Scan `root` in the background as the current operation.
    ///
    /// If `root` is a tracked scan folder its scan statistics are updated.
    pub async fn scan_folder(
        &mut self,
        root: &Path,
        extensions: Option<HashSet<String>>,
        cancel: CancellationToken,
        mut on_progress: impl FnMut(usize),
    ) -> AppResult<Vec<FileRecord>> {
        self.begin_operation(format!("Scanning {}", root.display()), 0, cancel.clone())?;

        let mut handle = self.scanner.spawn_scan(root.to_path_buf(), extensions, cancel.clone());
        while let Some(count) = handle.next_progress().await {
            self.update_progress(count);
            on_progress(count);
        }
        let outcome = handle.finish().await;
        self.end_operation();
        let records = outcome?;

        if !cancel.is_cancelled() {
            let normalized_root = normalize_path(root);
            let tracked = self
                .folders
                .list()
                .iter()
                .find(|folder| normalize_path(&folder.path) == normalized_root)
                .map(|folder| folder.id);
            if let Some(id) = tracked {
                self.folders.mark_scanned(id, records.len());
            }
        }
        Ok(records)
    }

    /// Apply a library icon to `files`.
    ///
    /// Each file is snapshotted just before it changes. Usage is counted
    /// once for the whole operation; the activity entry lists the files
    /// that actually changed.
    pub async fn apply_icon(
        &mut self,
        icon_id: Uuid,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> AppResult<BatchResult> {
        let icon = self
            .library
            .lookup(icon_id)
            .cloned()
            .ok_or(AppError::UnknownIcon(icon_id))?;
        let image = icon.image()?;

        let action = if files.len() > 1 {
            ActionKind::BatchApplied
        } else {
            ActionKind::Applied
        };
        let previous = match files.as_slice() {
            [single] if self.icons.has_custom_icon(single) => self
                .icons
                .current_icon(single)
                .ok()
                .map(|icon| icon.png_bytes().to_vec()),
            _ => None,
        };

        self.begin_operation(format!("Applying {}", icon.name), files.len(), cancel.clone())?;
        let outcome = self.run_apply(image, files, cancel, 0, 0, &mut on_progress).await;
        self.end_operation();
        let result = outcome?;

        self.library.increment_usage(icon_id);
        if !result.succeeded.is_empty() {
            let mut entry = ActivityEntry::new(action, result.succeeded.clone(), Some(icon_id));
            if let Some(data) = previous {
                entry = entry.with_previous_icon(data);
            }
            self.log_activity(entry);
        }
        Ok(result)
    }

    /// Clear custom icons from `files`
    pub async fn remove_icons(
        &mut self,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> AppResult<BatchResult> {
        self.begin_operation("Removing icons", files.len(), cancel.clone())?;

        let handle = self
            .icons
            .spawn_batch_remove(files, cancel, self.undo_recorder());
        let outcome = self.drive_batch(handle, 0, 0, &mut on_progress).await;
        self.end_operation();
        let result = outcome?;

        if !result.succeeded.is_empty() {
            self.log_activity(ActivityEntry::new(
                ActionKind::Removed,
                result.succeeded.clone(),
                None,
            ));
        }
        Ok(result)
    }

    /// Give every outlier the dominant icon of its extension
    pub async fn fix_inconsistency(
        &mut self,
        inconsistency: &Inconsistency,
        cancel: CancellationToken,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> AppResult<BatchResult> {
        let files: Vec<PathBuf> = inconsistency
            .outlier_files
            .iter()
            .map(|f| f.path.clone())
            .collect();

        self.begin_operation(
            format!("Fixing .{} icons", inconsistency.extension),
            files.len(),
            cancel.clone(),
        )?;
        let outcome = self
            .run_apply(inconsistency.dominant_icon.clone(), files, cancel, 0, 0, &mut on_progress)
            .await;
        self.end_operation();
        let result = outcome?;

        if !result.succeeded.is_empty() {
            self.log_activity(ActivityEntry::new(
                ActionKind::BatchApplied,
                result.succeeded.clone(),
                None,
            ));
        }
        Ok(result)
    }

    /// Apply every mapping of a preset to the scanned files of that extension.
    ///
    /// Mappings whose icon is gone from the library are skipped. One
    /// activity entry covers every file that changed.
    pub async fn apply_preset(
        &mut self,
        preset_id: Uuid,
        files: &[FileRecord],
        cancel: CancellationToken,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> AppResult<BatchResult> {
        let preset = self
            .presets
            .get(preset_id)
            .cloned()
            .ok_or(AppError::UnknownPreset(preset_id))?;

        let mut plan = Vec::new();
        for (extension, icon_id) in &preset.mappings {
            let targets: Vec<PathBuf> = files
                .iter()
                .filter(|f| &f.extension == extension)
                .map(|f| f.path.clone())
                .collect();
            if targets.is_empty() {
                continue;
            }
            let Some(icon) = self.library.lookup(*icon_id) else {
                tracing::warn!(
                    preset = %preset.name,
                    extension = %extension,
                    icon = %icon_id,
                    "preset maps to a missing icon"
                );
                continue;
            };
            match icon.image() {
                Ok(image) => plan.push((*icon_id, image, targets)),
                Err(err) => {
                    tracing::warn!(icon = %icon_id, error = %err, "preset icon unreadable");
                }
            }
        }

        let total = plan.iter().map(|(_, _, targets)| targets.len()).sum();
        self.begin_operation(format!("Applying preset {}", preset.name), total, cancel.clone())?;

        let mut combined = BatchResult::default();
        let mut offset = 0;
        for (icon_id, image, targets) in plan {
            if cancel.is_cancelled() {
                combined.cancelled = true;
                break;
            }
            let count = targets.len();
            let outcome = self
                .run_apply(image, targets, cancel.clone(), offset, total, &mut on_progress)
                .await;
            let result = match outcome {
                Ok(result) => result,
                Err(err) => {
                    self.end_operation();
                    return Err(err);
                }
            };
            offset += count;

            self.library.increment_usage(icon_id);
            combined.succeeded.extend(result.succeeded);
            combined.failed.extend(result.failed);
            combined.cancelled |= result.cancelled;
        }
        self.end_operation();

        if !combined.succeeded.is_empty() {
            self.log_activity(ActivityEntry::new(
                ActionKind::BatchApplied,
                combined.succeeded.clone(),
                None,
            ));
        }
        Ok(combined)
    }

    /// Import an image file into the library
    pub fn import_icon(
        &mut self,
        source: &Path,
        name: &str,
        category: IconCategory,
    ) -> AppResult<IconRecord> {
        Ok(self.library.import_from_path(source, name, category)?)
    }

    /// Import the clipboard's image, if any
    pub fn paste_icon(
        &mut self,
        clipboard: &mut dyn ClipboardSource,
        name: &str,
        category: IconCategory,
    ) -> AppResult<Option<IconRecord>> {
        Ok(self.library.import_from_clipboard(clipboard, name, category)?)
    }

    /// Store an externally generated image and log it
    pub fn add_generated_icon(
        &mut self,
        image: &IconImage,
        name: &str,
        category: IconCategory,
    ) -> AppResult<IconRecord> {
        let record = self.library.add_generated(image, name, category)?;
        self.log_activity(ActivityEntry::new(ActionKind::Generated, Vec::new(), Some(record.id)));
        Ok(record)
    }

    pub fn undo(&mut self) -> bool {
        self.undo.lock().undo()
    }

    pub fn clear_history(&mut self) {
        self.undo.lock().clear_history();
    }

    /// Record a finished operation. The icon it used, if any, is published
    /// to the recent-icons list.
    pub fn log_activity(&mut self, entry: ActivityEntry) {
        let used = entry.icon_used;
        self.activity.append(entry);

        if let Some(record) = used.and_then(|id| self.library.lookup(id)) {
            self.recent.publish(record);
        }
    }

    /// Accept an `iconsmith://apply` link; its files wait for the next apply
    pub fn handle_deep_link(&mut self, uri: &str) -> AppResult<&[PathBuf]> {
        self.pending_files = deeplink::parse_apply_uri(uri)?;
        tracing::info!(count = self.pending_files.len(), "files received from deep link");
        Ok(&self.pending_files)
    }

    pub fn pending_files(&self) -> &[PathBuf] {
        &self.pending_files
    }

    pub fn take_pending_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.pending_files)
    }

    // ---- internals ----

    async fn run_apply(
        &mut self,
        image: IconImage,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
        offset: usize,
        total: usize,
        on_progress: &mut impl FnMut(BatchProgress),
    ) -> AppResult<BatchResult> {
        let handle = self
            .icons
            .spawn_batch_apply(image, files, cancel, self.undo_recorder());
        self.drive_batch(handle, offset, total, on_progress).await
    }

    /// Per-file hook that snapshots a file into the undo ledger
    fn undo_recorder(&self) -> impl FnMut(&Path) + Send + 'static {
        let undo = Arc::clone(&self.undo);
        move |file: &Path| {
            undo.lock().record_before_change(file);
        }
    }

    /// Forward a batch's progress, shifted by `offset` when it is one leg of
    /// a larger operation of `total` files (0 keeps the batch's own total)
    async fn drive_batch(
        &mut self,
        mut handle: TaskHandle<BatchProgress, BatchResult>,
        offset: usize,
        total: usize,
        on_progress: &mut impl FnMut(BatchProgress),
    ) -> AppResult<BatchResult> {
        while let Some(progress) = handle.next_progress().await {
            let progress = BatchProgress {
                completed: offset + progress.completed,
                total: if total == 0 { progress.total } else { total },
            };
            self.update_progress(progress.completed);
            on_progress(progress);
        }
        Ok(handle.finish().await?)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("data_dir", &self.paths.data_dir())
            .field("icons", &self.library.len())
            .field("undo", &self.undo.lock().len())
            .field("activity", &self.activity.len())
            .field("pending_files", &self.pending_files.len())
            .field("current_operation", &self.current_operation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::MAX_UNDO_ENTRIES;
    use crate::icon::picture::solid_icon;
    use crate::icon::surface::fake::MemorySurface;
    use crate::scan::detect_inconsistencies;

    struct Fixture {
        temp: tempfile::TempDir,
        surface: Arc<MemorySurface>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: tempfile::tempdir().unwrap(),
                surface: Arc::new(MemorySurface::default()),
            }
        }

        fn paths(&self) -> AppPaths {
            AppPaths::at(self.temp.path().join("data"))
        }

        fn state(&self) -> AppState {
            let paths = self.paths();
            let markers = Arc::new(SidecarMarkers::open(paths.markers_file()));
            AppState::with_backends(paths, self.surface.clone(), markers)
        }

        fn touch(&self, name: &str) -> PathBuf {
            let dir = self.temp.path().join("work");
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, name).unwrap();
            path
        }

        fn stored_icon(&self, state: &mut AppState, r: u8, g: u8, b: u8) -> IconRecord {
            state
                .add_generated_icon(&solid_icon(r, g, b), "Icon", IconCategory::Custom)
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_apply_records_undo_activity_and_usage() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let icon = fx.stored_icon(&mut state, 0, 0, 255);
        let files = vec![fx.touch("a.ts"), fx.touch("b.ts"), fx.touch("c.ts")];

        let mut seen = Vec::new();
        let result = state
            .apply_icon(icon.id, files.clone(), CancellationToken::new(), |p| seen.push(p.completed))
            .await
            .unwrap();

        assert_eq!(result.succeeded, files);
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(state.current_operation().is_none());
        assert_eq!(state.undo_ledger().len(), 3);
        assert_eq!(state.library().lookup(icon.id).unwrap().usage_count, 1);

        let latest = &state.activity().entries()[0];
        assert_eq!(latest.action, ActionKind::BatchApplied);
        assert_eq!(latest.file_paths, files);
        assert_eq!(latest.icon_used, Some(icon.id));

        let recent = state.recent_icons().load();
        assert_eq!(recent[0].id, icon.id);
    }

    #[tokio::test]
    async fn test_single_apply_keeps_previous_icon_and_undo_restores_it() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let old = solid_icon(10, 10, 10);
        let file = fx.touch("logo.svg");
        fx.surface.set_icon(&file, Some(&old));
        let icon = fx.stored_icon(&mut state, 200, 0, 0);

        state
            .apply_icon(icon.id, vec![file.clone()], CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let entry = &state.activity().entries()[0];
        assert_eq!(entry.action, ActionKind::Applied);
        assert_eq!(entry.previous_icon_data.as_deref(), Some(old.png_bytes()));
        assert_ne!(fx.surface.custom_icon(&file), Some(old.clone()));

        assert!(state.undo());
        assert_eq!(fx.surface.custom_icon(&file), Some(old));
        assert!(!state.undo());
    }

    #[tokio::test]
    async fn test_apply_unknown_icon() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let missing = Uuid::new_v4();

        let err = state
            .apply_icon(missing, vec![fx.touch("x.md")], CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownIcon(id) if id == missing));
        assert!(state.undo_ledger().is_empty());
    }

    #[tokio::test]
    async fn test_remove_logs_and_clears() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let file = fx.touch("main.rs");
        fx.surface.set_icon(&file, Some(&solid_icon(1, 2, 3)));

        let result = state
            .remove_icons(vec![file.clone()], CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(result.success_count(), 1);
        assert_eq!(fx.surface.custom_icon(&file), None);
        assert_eq!(state.activity().entries()[0].action, ActionKind::Removed);
    }

    #[tokio::test]
    async fn test_fix_inconsistency_applies_dominant_icon() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let common = solid_icon(0, 100, 0);
        let odd = solid_icon(100, 0, 0);
        for i in 0..4 {
            let file = fx.touch(&format!("f{i}.json"));
            let icon = if i == 3 { &odd } else { &common };
            fx.surface.set_icon(&file, Some(icon));
        }

        let root = fx.temp.path().join("work");
        let records = state
            .scan_folder(&root, None, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        let found = detect_inconsistencies(&records);
        assert_eq!(found.len(), 1);

        let result = state
            .fix_inconsistency(&found[0], CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(result.success_count(), 1);

        let rescan = state
            .scan_folder(&root, None, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert!(detect_inconsistencies(&rescan).is_empty());

        let entry = &state.activity().entries()[0];
        assert_eq!(entry.action, ActionKind::BatchApplied);
        assert_eq!(entry.icon_used, None);
    }

    #[tokio::test]
    async fn test_scan_updates_tracked_folder() {
        let fx = Fixture::new();
        let mut state = fx.state();
        fx.touch("one.txt");
        fx.touch("two.txt");
        let root = fx.temp.path().join("work");
        let folder_id = state.folders_mut().add(&root).unwrap().id;

        let records = state
            .scan_folder(&root, None, CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        let folder = state.folders().get(folder_id).unwrap();
        assert_eq!(folder.file_count, Some(2));
        assert!(folder.last_scanned.is_some());
    }

    #[tokio::test]
    async fn test_apply_preset_by_extension() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let ts_icon = fx.stored_icon(&mut state, 0, 0, 200);
        let css_icon = fx.stored_icon(&mut state, 200, 0, 200);
        let preset_id = state.presets_mut().create("Web").id;
        state.presets_mut().set_mapping(preset_id, ".TS", ts_icon.id);
        state.presets_mut().set_mapping(preset_id, "css", css_icon.id);
        state.presets_mut().set_mapping(preset_id, "md", Uuid::new_v4());

        let a = fx.touch("a.ts");
        let b = fx.touch("b.css");
        fx.touch("c.md");
        fx.touch("d.txt");
        let root = fx.temp.path().join("work");
        let records = state
            .scan_folder(&root, None, CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let mut last = None;
        let result = state
            .apply_preset(preset_id, &records, CancellationToken::new(), |p| last = Some(p))
            .await
            .unwrap();

        assert_eq!(result.success_count(), 2);
        assert_eq!(last, Some(BatchProgress { completed: 2, total: 2 }));
        assert_eq!(fx.surface.custom_icon(&a), Some(solid_icon(0, 0, 200)));
        assert_eq!(fx.surface.custom_icon(&b), Some(solid_icon(200, 0, 200)));
        assert_eq!(state.library().lookup(ts_icon.id).unwrap().usage_count, 1);

        let entry = &state.activity().entries()[0];
        assert_eq!(entry.action, ActionKind::BatchApplied);
        assert_eq!(entry.file_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_preset() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let err = state
            .apply_preset(Uuid::new_v4(), &[], CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownPreset(_)));
    }

    #[test]
    fn test_only_one_operation_at_a_time() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let token = CancellationToken::new();

        state.begin_operation("first", 3, token.clone()).unwrap();
        let err = state.begin_operation("second", 1, CancellationToken::new()).unwrap_err();
        assert!(matches!(err, AppError::OperationInProgress(name) if name == "first"));

        state.update_progress(2);
        let op = state.current_operation().unwrap();
        assert_eq!(op.current, 2);
        assert_eq!(op.fraction(), Some(2.0 / 3.0));

        state.cancel_current_operation();
        assert!(token.is_cancelled());
        assert!(state.current_operation().unwrap().is_cancelled());

        state.end_operation();
        assert!(state.current_operation().is_none());
        state.begin_operation("second", 1, CancellationToken::new()).unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_apply_keeps_completed_files() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let icon = fx.stored_icon(&mut state, 50, 50, 50);
        let earlier = fx.touch("earlier.txt");
        fx.surface.set_icon(&earlier, Some(&solid_icon(1, 1, 1)));
        state
            .apply_icon(icon.id, vec![earlier.clone()], CancellationToken::new(), |_| {})
            .await
            .unwrap();
        let snapshot = state.undo_ledger().entries()[0]
            .original_icon_path
            .clone()
            .unwrap();
        let logged = state.activity().len();

        let files: Vec<PathBuf> = (0..MAX_UNDO_ENTRIES)
            .map(|i| fx.touch(&format!("n{i}.txt")))
            .collect();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = state
            .apply_icon(icon.id, files.clone(), cancel, |_| {})
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.total_count(), 0);
        assert!(state.current_operation().is_none());
        assert!(!fx.surface.has_custom_icon(&files[0]));

        // History from before the cancelled batch is untouched
        assert_eq!(state.undo_ledger().len(), 1);
        assert_eq!(state.undo_ledger().entries()[0].file_path, earlier);
        assert!(snapshot.exists());
        assert_eq!(state.activity().len(), logged);

        assert!(state.undo());
        assert_eq!(fx.surface.custom_icon(&earlier), Some(solid_icon(1, 1, 1)));
    }

    #[tokio::test]
    async fn test_cancelled_remove_keeps_undo_history() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let icon = fx.stored_icon(&mut state, 80, 0, 80);
        let kept = fx.touch("kept.css");
        state
            .apply_icon(icon.id, vec![kept.clone()], CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let files: Vec<PathBuf> = (0..3).map(|i| fx.touch(&format!("r{i}.css"))).collect();
        for file in &files {
            fx.surface.set_icon(file, Some(&solid_icon(5, 5, 5)));
        }
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = state.remove_icons(files, cancel, |_| {}).await.unwrap();

        assert!(result.cancelled);
        assert_eq!(state.undo_ledger().len(), 1);
        assert_eq!(state.undo_ledger().entries()[0].file_path, kept);
    }

    #[tokio::test]
    async fn test_scan_matches_tracked_folder_by_normalized_path() {
        let fx = Fixture::new();
        let mut state = fx.state();
        fx.touch("only.txt");
        let root = fx.temp.path().join("work");
        fs::create_dir_all(root.join("nested")).unwrap();
        let folder_id = state.folders_mut().add(&root).unwrap().id;

        let spelled_differently = root.join("nested").join("..");
        state
            .scan_folder(&spelled_differently, None, CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let folder = state.folders().get(folder_id).unwrap();
        assert_eq!(folder.file_count, Some(1));
    }

    #[test]
    fn test_generated_icon_is_logged_and_published() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let record = fx.stored_icon(&mut state, 9, 99, 199);

        let entry = &state.activity().entries()[0];
        assert_eq!(entry.action, ActionKind::Generated);
        assert_eq!(entry.icon_used, Some(record.id));
        assert_eq!(state.recent_icons().load()[0].id, record.id);
    }

    #[test]
    fn test_deep_link_sets_pending_files() {
        let fx = Fixture::new();
        let mut state = fx.state();
        let files = vec![PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/b c.txt")];

        let uri = deeplink::apply_uri(&files);
        assert_eq!(state.handle_deep_link(&uri).unwrap(), files.as_slice());
        assert_eq!(state.take_pending_files(), files);
        assert!(state.pending_files().is_empty());

        assert!(state.handle_deep_link("iconsmith://nope").is_err());
    }

    #[test]
    fn test_state_reloads_from_disk() {
        let fx = Fixture::new();
        let id = {
            let mut state = fx.state();
            let record = fx.stored_icon(&mut state, 3, 3, 3);
            state.presets_mut().create("Kept");
            record.id
        };

        let state = fx.state();
        assert!(state.library().lookup(id).is_some());
        assert_eq!(state.presets().list()[0].name, "Kept");
        assert_eq!(state.activity().len(), 1);
    }
}
