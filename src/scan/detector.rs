//! Icon-consistency detection
//!
//! Files of one extension are grouped by icon fingerprint. The largest
//! group is dominant; on a size tie the smallest fingerprint wins. Every
//! file outside the dominant group is an outlier.

use std::collections::BTreeMap;

use crate::icon::picture::{Fingerprint, IconImage};
use crate::state::data::FileRecord;

/// Files of one extension that do not all share an icon
#[derive(Debug, Clone, PartialEq)]
pub struct Inconsistency {
    pub extension: String,
    pub total_files: usize,
    /// Number of distinct icon groups (always at least 2)
    pub different_icon_count: usize,
    pub dominant_fingerprint: Fingerprint,
    pub dominant_icon: IconImage,
    /// Files outside the dominant group, in input order
    pub outlier_files: Vec<FileRecord>,
}

/// One record per extension that carries more than one icon, ordered by
/// extension
pub fn detect_inconsistencies(files: &[FileRecord]) -> Vec<Inconsistency> {
    let mut by_extension: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
    for file in files {
        by_extension.entry(file.extension.as_str()).or_default().push(file);
    }

    by_extension
        .into_iter()
        .filter_map(|(ext, group)| analyze_extension(ext, &group))
        .collect()
}

/// Check files that share `extension`. `None` when they all carry one icon.
pub fn analyze_extension(extension: &str, files: &[&FileRecord]) -> Option<Inconsistency> {
    let mut groups: BTreeMap<&Fingerprint, Vec<&FileRecord>> = BTreeMap::new();
    for &file in files {
        groups.entry(&file.fingerprint).or_default().push(file);
    }

    if groups.len() < 2 {
        return None;
    }

    // Ascending iteration with a strict comparison keeps the smallest
    // fingerprint on a count tie
    let mut dominant: Option<(&Fingerprint, &Vec<&FileRecord>)> = None;
    for (fingerprint, members) in &groups {
        if dominant.map_or(true, |(_, best)| members.len() > best.len()) {
            dominant = Some((*fingerprint, members));
        }
    }
    let (dominant_fingerprint, dominant_members) = dominant?;

    let outlier_files: Vec<FileRecord> = files
        .iter()
        .filter(|f| &f.fingerprint != dominant_fingerprint)
        .map(|f| (*f).clone())
        .collect();

    tracing::debug!(
        extension,
        groups = groups.len(),
        dominant = %dominant_fingerprint,
        outliers = outlier_files.len(),
        "inconsistent icons"
    );

    Some(Inconsistency {
        extension: extension.to_string(),
        total_files: files.len(),
        different_icon_count: groups.len(),
        dominant_fingerprint: (*dominant_fingerprint).clone(),
        dominant_icon: dominant_members[0].icon.clone(),
        outlier_files,
    })
}
