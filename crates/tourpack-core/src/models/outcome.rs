//! Per-event extraction results.

use serde::{Serialize, Serializer};

use crate::error::{ErrorKind, PipelineError};
use crate::models::event::SourceLocation;

/// One file written to the destination store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedEntry {
    /// Leaf name of the entry inside the archive
    pub filename: String,
    #[serde(rename = "s3_key")]
    pub destination_key: String,
    pub size: u64,
    pub content_type: String,
}

/// Successful extraction of one archive
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTour {
    source_file: String,
    tour_directory: String,
    extracted_files: Vec<ExtractedEntry>,
    file_count: usize,
}

impl ExtractedTour {
    pub fn new(
        source: &SourceLocation,
        namespace: impl Into<String>,
        entries: Vec<ExtractedEntry>,
    ) -> Self {
        Self {
            source_file: source.to_string(),
            tour_directory: namespace.into(),
            file_count: entries.len(),
            extracted_files: entries,
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// Destination namespace, e.g. `tours/My Tour/`
    pub fn namespace(&self) -> &str {
        &self.tour_directory
    }

    /// Namespace without the `tours/` prefix and trailing slash
    pub fn tour_name(&self) -> &str {
        self.tour_directory
            .strip_prefix(crate::constants::TOURS_PREFIX)
            .unwrap_or(&self.tour_directory)
            .trim_end_matches('/')
    }

    pub fn entries(&self) -> &[ExtractedEntry] {
        &self.extracted_files
    }

    pub fn entry_count(&self) -> usize {
        self.file_count
    }

    pub fn total_size(&self) -> u64 {
        self.extracted_files.iter().map(|e| e.size).sum()
    }
}

/// Failed handling of one upload event
#[derive(Debug, Clone, Serialize)]
pub struct FailedExtraction {
    pub source_file: String,
    pub error: String,
    #[serde(rename = "error_code")]
    pub kind: ErrorKind,
}

impl FailedExtraction {
    pub fn new(source: &SourceLocation, error: &PipelineError) -> Self {
        Self {
            source_file: source.to_string(),
            error: error.to_string(),
            kind: error.kind(),
        }
    }
}

/// Result of handling one upload event
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    Extracted(ExtractedTour),
    Failed(FailedExtraction),
}

impl ExtractionOutcome {
    pub fn failed(source: &SourceLocation, error: &PipelineError) -> Self {
        ExtractionOutcome::Failed(FailedExtraction::new(source, error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Extracted(_))
    }

    pub fn tour(&self) -> Option<&ExtractedTour> {
        match self {
            ExtractionOutcome::Extracted(tour) => Some(tour),
            ExtractionOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailedExtraction> {
        match self {
            ExtractionOutcome::Extracted(_) => None,
            ExtractionOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn source_file(&self) -> &str {
        match self {
            ExtractionOutcome::Extracted(tour) => tour.source_file(),
            ExtractionOutcome::Failed(failure) => &failure.source_file,
        }
    }
}

#[derive(Serialize)]
struct OutcomeRecord<'a> {
    success: bool,
    #[serde(flatten)]
    tour: Option<&'a ExtractedTour>,
    #[serde(flatten)]
    failure: Option<&'a FailedExtraction>,
}

impl Serialize for ExtractionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutcomeRecord {
            success: self.is_success(),
            tour: self.tour(),
            failure: self.failure(),
        }
        .serialize(serializer)
    }
}

/// Ordered outcomes of one invocation; index `i` belongs to trigger record `i`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    outcomes: Vec<ExtractionOutcome>,
}

impl BatchResult {
    pub fn new(outcomes: Vec<ExtractionOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[ExtractionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True only for a non-empty batch without a single failure.
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(ExtractionOutcome::is_success)
    }

    pub fn first_failure(&self) -> Option<&FailedExtraction> {
        self.outcomes.iter().find_map(ExtractionOutcome::failure)
    }

    pub fn tours(&self) -> impl Iterator<Item = &ExtractedTour> {
        self.outcomes.iter().filter_map(ExtractionOutcome::tour)
    }
}
