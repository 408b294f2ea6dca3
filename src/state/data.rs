//! Shared data structures for the application state
//!
//! These structs are the records that flow between the JSON stores,
//! the scanner and the workflows in `app.rs`. Field names serialize in
//! camelCase so the files stay readable by the companion extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::icon::picture::{Fingerprint, IconImage};

/// One file seen by a scan. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Full path to the file
    pub path: PathBuf,
    /// Filename only (e.g., "index.ts")
    pub filename: String,
    /// Lowercased suffix after the last dot
    pub extension: String,
    /// Icon currently displayed for the file
    pub icon: IconImage,
    /// Content fingerprint of `icon`
    pub fingerprint: Fingerprint,
    pub has_custom_icon: bool,
    /// Whether this tool last set the file's icon
    pub has_marker: bool,
}

/// Icon grouping used by the library views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IconCategory {
    Code,
    Design,
    System,
    Custom,
}

impl IconCategory {
    pub const ALL: [IconCategory; 4] = [
        IconCategory::Code,
        IconCategory::Design,
        IconCategory::System,
        IconCategory::Custom,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            IconCategory::Code => "Code",
            IconCategory::Design => "Design",
            IconCategory::System => "System",
            IconCategory::Custom => "Custom",
        }
    }

    /// Parse a display or serialized name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Where an icon record came from. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IconSource {
    Bundled,
    Imported,
    AiGenerated,
    Clipboard,
}

/// A stored, reusable icon
///
/// Equality is by `id` only: two records may carry identical images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRecord {
    pub id: Uuid,
    pub name: String,
    /// Backing image, owned exclusively by this record
    pub path: PathBuf,
    pub category: IconCategory,
    pub source: IconSource,
    pub date_added: DateTime<Utc>,
    /// Incremented once per apply operation, not per file
    pub usage_count: u64,
    pub associated_extensions: Vec<String>,
}

impl IconRecord {
    pub fn new(name: impl Into<String>, path: PathBuf, category: IconCategory, source: IconSource) -> Self {
        Self::with_id(Uuid::new_v4(), name, path, category, source)
    }

    pub fn with_id(
        id: Uuid,
        name: impl Into<String>,
        path: PathBuf,
        category: IconCategory,
        source: IconSource,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            path,
            category,
            source,
            date_added: Utc::now(),
            usage_count: 0,
            associated_extensions: Vec::new(),
        }
    }

    /// Load the backing image
    pub fn image(&self) -> crate::error::ImageResult<IconImage> {
        IconImage::load(&self.path)
    }
}

impl PartialEq for IconRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for IconRecord {}

impl std::hash::Hash for IconRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Enough to reverse one icon change on one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub file_path: PathBuf,
    pub had_custom_icon: bool,
    /// Saved copy of the prior icon. Always `None` when `had_custom_icon` is false.
    pub original_icon_path: Option<PathBuf>,
}

/// Kind of a logged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Applied,
    Removed,
    BatchApplied,
    Generated,
}

impl ActionKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ActionKind::Applied => "Applied",
            ActionKind::Removed => "Removed",
            ActionKind::BatchApplied => "Batch Applied",
            ActionKind::Generated => "Generated",
        }
    }
}

/// One completed operation in the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub file_paths: Vec<PathBuf>,
    pub icon_used: Option<Uuid>,
    #[serde(default, with = "base64_bytes")]
    pub previous_icon_data: Option<Vec<u8>>,
}

impl ActivityEntry {
    pub fn new(action: ActionKind, file_paths: Vec<PathBuf>, icon_used: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            file_paths,
            icon_used,
            previous_icon_data: None,
        }
    }

    pub fn with_previous_icon(mut self, data: Vec<u8>) -> Self {
        self.previous_icon_data = Some(data);
        self
    }

    pub fn file_count(&self) -> usize {
        self.file_paths.len()
    }

    /// One-line description, e.g. "Batch Applied icon for 3 files"
    pub fn summary(&self) -> String {
        match self.file_paths.as_slice() {
            [single] => {
                let filename = single
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| single.display().to_string());
                format!("{} icon for {}", self.action.display_name(), filename)
            }
            paths => format!("{} icon for {} files", self.action.display_name(), paths.len()),
        }
    }
}

/// Saved mapping from file extension to icon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    /// Normalized extension (lowercase, no leading dot) to icon id
    pub mappings: BTreeMap<String, Uuid>,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

impl Preset {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mappings: BTreeMap::new(),
            date_created: now,
            date_modified: now,
        }
    }

    /// Normalize an extension: lowercase, surrounding dots trimmed
    pub fn normalize_extension(ext: &str) -> String {
        ext.trim().trim_matches('.').to_lowercase()
    }

    pub fn set_mapping(&mut self, ext: &str, icon_id: Uuid) {
        self.mappings.insert(Self::normalize_extension(ext), icon_id);
        self.date_modified = Utc::now();
    }

    pub fn remove_mapping(&mut self, ext: &str) {
        self.mappings.remove(&Self::normalize_extension(ext));
        self.date_modified = Utc::now();
    }

    pub fn mapping(&self, ext: &str) -> Option<Uuid> {
        self.mappings.get(&Self::normalize_extension(ext)).copied()
    }
}

/// A folder the user keeps around for scanning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFolder {
    pub id: Uuid,
    pub path: PathBuf,
    pub date_added: DateTime<Utc>,
    pub last_scanned: Option<DateTime<Utc>>,
    pub file_count: Option<usize>,
}

impl ScanFolder {
    pub fn new(path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            date_added: Utc::now(),
            last_scanned: None,
            file_count: None,
        }
    }

    /// Last path component, for display
    pub fn display_name(&self) -> String {
        display_name_of(&self.path)
    }
}

fn display_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Optional bytes as a base64 string in JSON
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_normalizes_extensions() {
        let mut preset = Preset::new("Web");
        let icon = Uuid::new_v4();

        preset.set_mapping("JPG", icon);
        assert_eq!(preset.mapping("jpg"), Some(icon));
        assert_eq!(preset.mapping(".Jpg"), Some(icon));

        preset.remove_mapping(".jpg");
        assert_eq!(preset.mapping("jpg"), None);
        assert!(preset.mappings.is_empty());
    }

    #[test]
    fn test_preset_mutation_touches_modified_date() {
        let mut preset = Preset::new("Docs");
        let created = preset.date_modified;
        std::thread::sleep(std::time::Duration::from_millis(2));
        preset.set_mapping("md", Uuid::new_v4());
        assert!(preset.date_modified > created);
        assert_eq!(preset.date_created, created);
    }

    #[test]
    fn test_icon_record_equality_is_by_id() {
        let a = IconRecord::new("A", PathBuf::from("/x.png"), IconCategory::Code, IconSource::Imported);
        let mut b = a.clone();
        b.name = "Renamed".into();
        assert_eq!(a, b);

        let c = IconRecord::new("A", PathBuf::from("/x.png"), IconCategory::Code, IconSource::Imported);
        assert_ne!(a, c);
    }

    #[test]
    fn test_activity_summary() {
        let single = ActivityEntry::new(ActionKind::Applied, vec![PathBuf::from("/a/b/report.pdf")], None);
        assert_eq!(single.summary(), "Applied icon for report.pdf");

        let many = ActivityEntry::new(
            ActionKind::BatchApplied,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")],
            None,
        );
        assert_eq!(many.summary(), "Batch Applied icon for 3 files");
    }

    #[test]
    fn test_activity_previous_icon_is_base64() {
        let entry = ActivityEntry::new(ActionKind::Removed, vec![], None).with_previous_icon(vec![1, 2, 3]);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["previousIconData"], "AQID");
        assert_eq!(json["action"], "removed");

        let back: ActivityEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(IconCategory::parse("design"), Some(IconCategory::Design));
        assert_eq!(IconCategory::parse(" CODE "), Some(IconCategory::Code));
        assert_eq!(IconCategory::parse("music"), None);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(IconSource::AiGenerated).unwrap(), "aiGenerated");
        assert_eq!(serde_json::to_value(ActionKind::BatchApplied).unwrap(), "batchApplied");
    }
}
