//! Tour metadata summarised from an extraction manifest.
//!
//! Nothing here is persisted; the summary is recomputed whenever a notification is
//! built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::{CONFIG_FILE_NAMES, ENTRY_POINT_NAMES};
use crate::models::outcome::{ExtractedEntry, ExtractedTour};

/// Coarse file category used in the per-type breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Html,
    Css,
    Javascript,
    Images,
    Videos,
    Audio,
    Config,
    Documentation,
    Other,
}

impl FileCategory {
    /// Classify by content type first, then fall back to the file name.
    pub fn classify(filename: &str, content_type: &str) -> Self {
        let lower = filename.to_lowercase();
        if content_type.starts_with("text/html") {
            FileCategory::Html
        } else if content_type.starts_with("text/css") {
            FileCategory::Css
        } else if content_type.starts_with("application/javascript")
            || content_type.starts_with("text/javascript")
        {
            FileCategory::Javascript
        } else if content_type.starts_with("image/") {
            FileCategory::Images
        } else if content_type.starts_with("video/") {
            FileCategory::Videos
        } else if content_type.starts_with("audio/") {
            FileCategory::Audio
        } else if lower.ends_with(".json") {
            FileCategory::Config
        } else if lower.ends_with(".txt") || lower.ends_with(".md") {
            FileCategory::Documentation
        } else {
            FileCategory::Other
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub count: usize,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TourMetadata {
    pub tour_path: String,
    pub total_files: usize,
    pub total_size: u64,
    pub file_types: BTreeMap<FileCategory, CategoryStats>,
    pub entry_point: Option<String>,
    pub config_file: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub files: Vec<ExtractedEntry>,
}

impl TourMetadata {
    pub fn from_tour(tour: &ExtractedTour) -> Self {
        Self::summarize(tour.namespace(), tour.entries())
    }

    pub fn summarize(tour_path: &str, entries: &[ExtractedEntry]) -> Self {
        let mut file_types: BTreeMap<FileCategory, CategoryStats> = BTreeMap::new();
        for entry in entries {
            let stats = file_types
                .entry(FileCategory::classify(&entry.filename, &entry.content_type))
                .or_default();
            stats.count += 1;
            stats.size += entry.size;
        }

        Self {
            tour_path: tour_path.to_string(),
            total_files: entries.len(),
            total_size: entries.iter().map(|e| e.size).sum(),
            file_types,
            entry_point: first_named(entries, &ENTRY_POINT_NAMES),
            config_file: first_named(entries, &CONFIG_FILE_NAMES),
            processed_at: Utc::now(),
            files: entries.to_vec(),
        }
    }
}

/// First entry (in manifest order) whose lowercased leaf name is in `names`.
fn first_named(entries: &[ExtractedEntry], names: &[&str]) -> Option<String> {
    entries
        .iter()
        .map(|e| e.filename.to_lowercase())
        .find(|name| names.contains(&name.as_str()))
}
