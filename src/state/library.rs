use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::data::{IconCategory, IconRecord, IconSource};
use super::persist;
use crate::config::AppPaths;
use crate::error::{ImageError, StoreError, StoreResult};
use crate::icon::clipboard::ClipboardSource;
use crate::icon::picture::IconImage;

/// Field-level change to an icon record.
///
/// `source` and `id` have no variant: they are fixed once a record exists.
#[derive(Debug, Clone, PartialEq)]
pub enum IconUpdate {
    Rename(String),
    Recategorize(IconCategory),
    SetExtensions(Vec<String>),
    IncrementUsage,
}

/// The IconLibrary manages the icon catalog (`library.json`) and the
/// backing image files under `Icons/`.
///
/// Every mutation rewrites the catalog before returning.
pub struct IconLibrary {
    icons: Vec<IconRecord>,
    library_file: PathBuf,
    paths: AppPaths,
}

impl IconLibrary {
    /// Load the catalog. A missing or unreadable file yields an empty library.
    pub fn open(paths: &AppPaths) -> Self {
        let library_file = paths.library_file();
        let icons: Vec<IconRecord> = persist::load_list(&library_file);

        tracing::info!(path = %library_file.display(), count = icons.len(), "icon library loaded");

        Self {
            icons,
            library_file,
            paths: paths.clone(),
        }
    }

    /// Get the path of the catalog file
    pub fn path(&self) -> &Path {
        &self.library_file
    }

    pub fn icons(&self) -> &[IconRecord] {
        &self.icons
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn lookup(&self, id: Uuid) -> Option<&IconRecord> {
        self.icons.iter().find(|icon| icon.id == id)
    }

    /// All icons, or only those in `category`
    pub fn list(&self, category: Option<IconCategory>) -> Vec<&IconRecord> {
        self.icons
            .iter()
            .filter(|icon| category.map_or(true, |c| icon.category == c))
            .collect()
    }

    /// Case-insensitive substring match on the display name.
    /// An empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<&IconRecord> {
        if query.is_empty() {
            return self.icons.iter().collect();
        }
        let needle = query.to_lowercase();
        self.icons
            .iter()
            .filter(|icon| icon.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn add(&mut self, record: IconRecord) {
        tracing::debug!(id = %record.id, name = %record.name, "icon added");
        self.icons.push(record);
        self.save();
    }

    /// Drop a record and delete its backing image. Unknown ids are ignored.
    pub fn remove(&mut self, id: Uuid) {
        let Some(index) = self.icons.iter().position(|icon| icon.id == id) else {
            return;
        };
        let record = self.icons.remove(index);
        if let Err(err) = fs::remove_file(&record.path) {
            tracing::debug!(path = %record.path.display(), error = %err, "backing image already gone");
        }
        self.save();
    }

    /// Apply a field-level change. Unknown ids are a no-op.
    pub fn update(&mut self, id: Uuid, update: IconUpdate) {
        let Some(icon) = self.icons.iter_mut().find(|icon| icon.id == id) else {
            return;
        };
        match update {
            IconUpdate::Rename(name) => icon.name = name,
            IconUpdate::Recategorize(category) => icon.category = category,
            IconUpdate::SetExtensions(extensions) => icon.associated_extensions = extensions,
            IconUpdate::IncrementUsage => icon.usage_count += 1,
        }
        self.save();
    }

    pub fn increment_usage(&mut self, id: Uuid) {
        self.update(id, IconUpdate::IncrementUsage);
    }

    /// Copy an image file into `Icons/imported` under a fresh id
    pub fn import_from_path(
        &mut self,
        source: &Path,
        name: &str,
        category: IconCategory,
    ) -> StoreResult<IconRecord> {
        let id = Uuid::new_v4();
        let filename = match source.extension() {
            Some(ext) => format!("{}.{}", id, ext.to_string_lossy()),
            None => id.to_string(),
        };
        let destination_dir = self.paths.icons_dir("imported");
        let destination = destination_dir.join(filename);

        fs::create_dir_all(&destination_dir)?;
        fs::copy(source, &destination).map_err(|err| StoreError::CopyFailed {
            source_path: source.to_path_buf(),
            source: err,
        })?;

        let record = IconRecord::with_id(id, name, destination, category, IconSource::Imported);
        self.add(record.clone());

        tracing::info!(id = %id, from = %source.display(), "icon imported");
        Ok(record)
    }

    /// Store the clipboard's image as PNG under `Icons/clipboard`.
    ///
    /// Returns `Ok(None)` when the clipboard holds no image.
    pub fn import_from_clipboard(
        &mut self,
        clipboard: &mut dyn ClipboardSource,
        name: &str,
        category: IconCategory,
    ) -> StoreResult<Option<IconRecord>> {
        let Some(image) = clipboard.read_image()? else {
            return Ok(None);
        };
        let record = self.store_png(&image, "clipboard", name, category, IconSource::Clipboard)?;
        Ok(Some(record))
    }

    /// Store an externally generated image under `Icons/generated`
    pub fn add_generated(
        &mut self,
        image: &IconImage,
        name: &str,
        category: IconCategory,
    ) -> StoreResult<IconRecord> {
        self.store_png(image, "generated", name, category, IconSource::AiGenerated)
    }

    fn store_png(
        &mut self,
        image: &IconImage,
        kind: &str,
        name: &str,
        category: IconCategory,
        source: IconSource,
    ) -> StoreResult<IconRecord> {
        let id = Uuid::new_v4();
        let destination_dir = self.paths.icons_dir(kind);
        let destination = destination_dir.join(format!("{}.png", id));

        fs::create_dir_all(&destination_dir)?;
        image.save(&destination).map_err(|err| match err {
            ImageError::Io(io) => StoreError::Io(io),
            other => StoreError::Image(other),
        })?;

        let record = IconRecord::with_id(id, name, destination, category, source);
        self.add(record.clone());
        Ok(record)
    }

    fn save(&self) {
        persist::save_list(&self.library_file, &self.icons);
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for IconLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconLibrary")
            .field("library_file", &self.library_file)
            .field("icons", &self.icons.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::clipboard::FakeClipboard;
    use crate::icon::picture::solid_icon;

    fn library(root: &Path) -> IconLibrary {
        IconLibrary::open(&AppPaths::at(root))
    }

    fn record(name: &str, category: IconCategory) -> IconRecord {
        IconRecord::new(name, PathBuf::from(format!("/icons/{name}.png")), category, IconSource::Bundled)
    }

    fn same_fields(a: &IconRecord, b: &IconRecord) -> bool {
        serde_json::to_value(a).unwrap() == serde_json::to_value(b).unwrap()
    }

    #[test]
    fn test_lookup_after_add_returns_identical_fields() {
        let temp = tempfile::tempdir().unwrap();
        let mut lib = library(temp.path());
        let mut icon = record("TypeScript", IconCategory::Code);
        icon.usage_count = 4;
        icon.associated_extensions = vec!["ts".into(), "tsx".into()];

        lib.add(icon.clone());

        assert!(same_fields(lib.lookup(icon.id).unwrap(), &icon));
        assert!(lib.lookup(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_list_and_search() {
        let temp = tempfile::tempdir().unwrap();
        let mut lib = library(temp.path());
        lib.add(record("Rust Crab", IconCategory::Code));
        lib.add(record("Figma", IconCategory::Design));
        lib.add(record("rusty gear", IconCategory::System));

        assert_eq!(lib.list(None).len(), 3);
        assert_eq!(lib.list(Some(IconCategory::Design)).len(), 1);
        assert_eq!(lib.search("RUST").len(), 2);
        assert_eq!(lib.search("").len(), 3);
        assert!(lib.search("photoshop").is_empty());
    }

    #[test]
    fn test_update_and_usage() {
        let temp = tempfile::tempdir().unwrap();
        let mut lib = library(temp.path());
        let icon = record("Old", IconCategory::Custom);
        lib.add(icon.clone());

        lib.update(icon.id, IconUpdate::Rename("New".into()));
        lib.update(icon.id, IconUpdate::Recategorize(IconCategory::Design));
        lib.increment_usage(icon.id);
        lib.increment_usage(icon.id);
        // Unknown id is a no-op
        lib.update(Uuid::new_v4(), IconUpdate::Rename("ghost".into()));

        let stored = lib.lookup(icon.id).unwrap();
        assert_eq!(stored.name, "New");
        assert_eq!(stored.category, IconCategory::Design);
        assert_eq!(stored.usage_count, 2);
        assert_eq!(stored.source, IconSource::Bundled);
    }

    #[test]
    fn test_import_copies_and_remove_deletes() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("logo.png");
        solid_icon(20, 40, 60).save(&source).unwrap();

        let mut lib = library(temp.path());
        let icon = lib.import_from_path(&source, "Logo", IconCategory::Design).unwrap();

        assert_eq!(icon.source, IconSource::Imported);
        assert!(icon.path.starts_with(temp.path().join("Icons/imported")));
        assert_eq!(icon.path.extension().unwrap(), "png");
        assert!(icon.path.exists());
        assert!(source.exists());

        lib.remove(icon.id);
        assert!(!icon.path.exists());
        assert!(lib.is_empty());

        // Removing again, or a record whose file is already gone, is silent
        lib.remove(icon.id);
    }

    #[test]
    fn test_import_missing_source_fails_with_copy_error() {
        let temp = tempfile::tempdir().unwrap();
        let mut lib = library(temp.path());
        let result = lib.import_from_path(&temp.path().join("nope.png"), "Nope", IconCategory::Custom);
        assert!(matches!(result, Err(StoreError::CopyFailed { .. })));
        assert!(lib.is_empty());
    }

    #[test]
    fn test_clipboard_import() {
        let temp = tempfile::tempdir().unwrap();
        let mut lib = library(temp.path());

        let mut empty = FakeClipboard(None);
        assert!(lib
            .import_from_clipboard(&mut empty, "Nothing", IconCategory::Custom)
            .unwrap()
            .is_none());

        let image = solid_icon(7, 7, 7);
        let mut clipboard = FakeClipboard(Some(image.clone()));
        let icon = lib
            .import_from_clipboard(&mut clipboard, "Pasted", IconCategory::Custom)
            .unwrap()
            .unwrap();

        assert_eq!(icon.source, IconSource::Clipboard);
        assert!(icon.path.starts_with(temp.path().join("Icons/clipboard")));
        assert_eq!(icon.image().unwrap(), image);
    }

    #[test]
    fn test_catalog_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let mut lib = library(temp.path());
        lib.add(record("One", IconCategory::Code));
        lib.add(record("Two", IconCategory::System));
        let generated = lib
            .add_generated(&solid_icon(1, 1, 1), "Three", IconCategory::Custom)
            .unwrap();
        assert_eq!(generated.source, IconSource::AiGenerated);

        let reloaded = library(temp.path());
        assert_eq!(reloaded.len(), 3);
        for (a, b) in lib.icons().iter().zip(reloaded.icons()) {
            assert!(same_fields(a, b));
        }
    }
}
