//! Sculpture Dataset Store
//!
//! Loads the dataset file once at startup and answers all lookups from
//! memory. A missing or unparseable file degrades to an empty store: every
//! accessor then reports "not found" instead of failing, so a broken dataset
//! never takes the relay down.

use crate::models::{DatasetDocument, GeneralInfo, SculptureRecord, SearchCriteria};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Read-only, in-memory view of the sculpture dataset.
pub struct SculptureStore {
    document: Option<DatasetDocument>,
}

impl SculptureStore {
    /// Loads the dataset from `path`.
    ///
    /// Failures are logged and yield an empty store; they are never
    /// propagated. Calling this again with unchanged file content produces a
    /// store with identical accessor results.
    pub fn load(path: &Path) -> Self {
        match read_document(path) {
            Ok(document) => {
                info!(
                    path = %path.display(),
                    sculptures = document.sculptures.len(),
                    "Sculpture dataset loaded"
                );
                Self {
                    document: Some(document),
                }
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load the sculpture dataset; lookups will return nothing"
                );
                Self { document: None }
            }
        }
    }

    /// A store over an already-built document, for handlers and tests.
    pub fn from_document(document: DatasetDocument) -> Self {
        Self {
            document: Some(document),
        }
    }

    /// A store with no data, equivalent to a failed load.
    pub fn empty() -> Self {
        Self { document: None }
    }

    pub fn gallery_info(&self) -> Option<&GeneralInfo> {
        self.document
            .as_ref()
            .map(|d| &d.general_information.gallery_collection)
    }

    pub fn gothic_style_info(&self) -> Option<&GeneralInfo> {
        self.document
            .as_ref()
            .map(|d| &d.general_information.gothic_style)
    }

    /// The names of all records, in dataset order.
    pub fn sculpture_names(&self) -> impl Iterator<Item = &str> {
        self.sculptures().iter().map(|r| r.name.as_str())
    }

    /// Finds records matching a name query, best matches first.
    ///
    /// Three tiers, first non-empty one wins: case-insensitive exact match on
    /// the trimmed query; match after normalization (punctuation stripped,
    /// whitespace collapsed); substring match on the record name, longest
    /// names first so the most specific title leads.
    pub fn find_by_name(&self, query: &str) -> Vec<&SculptureRecord> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        let lowered = trimmed.to_lowercase();

        let exact: Vec<&SculptureRecord> = self
            .sculptures()
            .iter()
            .filter(|r| r.name.to_lowercase() == lowered)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let normalized = normalize_name(trimmed);
        if !normalized.is_empty() {
            let by_normalized: Vec<&SculptureRecord> = self
                .sculptures()
                .iter()
                .filter(|r| normalize_name(&r.name) == normalized)
                .collect();
            if !by_normalized.is_empty() {
                return by_normalized;
            }
        }

        let mut partial: Vec<&SculptureRecord> = self
            .sculptures()
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&lowered))
            .collect();
        partial.sort_by(|a, b| b.name.len().cmp(&a.name.len()));
        partial
    }

    /// The single best match for a name query, if any.
    pub fn get_by_name(&self, query: &str) -> Option<&SculptureRecord> {
        self.find_by_name(query).into_iter().next()
    }

    /// Filters records by the given criteria.
    ///
    /// With no criteria present the result is always empty (never the whole
    /// dataset). A present criterion must be a case-insensitive substring of
    /// the record's corresponding field, but a record that lacks that field
    /// entirely is not rejected by it. That permissiveness makes the search
    /// behave like an OR of the supplied criteria for sparse records, and
    /// callers rely on it.
    pub fn search(&self, criteria: &SearchCriteria) -> Vec<&SculptureRecord> {
        let name = active_criterion(criteria.name.as_deref());
        let artist = active_criterion(criteria.artist.as_deref());
        let location = active_criterion(criteria.location.as_deref());
        let year = active_criterion(criteria.year.as_deref());

        if name.is_none() && artist.is_none() && location.is_none() && year.is_none() {
            return Vec::new();
        }

        self.sculptures()
            .iter()
            .filter(|r| {
                field_matches(Some(&r.name), name.as_deref())
                    && field_matches(r.artist.as_deref(), artist.as_deref())
                    && field_matches(r.location.as_deref(), location.as_deref())
                    && field_matches(r.year.as_deref(), year.as_deref())
            })
            .collect()
    }

    fn sculptures(&self) -> &[SculptureRecord] {
        self.document
            .as_ref()
            .map(|d| d.sculptures.as_slice())
            .unwrap_or(&[])
    }
}

fn read_document(path: &Path) -> anyhow::Result<DatasetDocument> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Lowercases, strips everything that is not a word character or whitespace,
/// and collapses runs of whitespace to single spaces.
fn normalize_name(value: &str) -> String {
    let stripped: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn active_criterion(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn field_matches(field: Option<&str>, criterion: Option<&str>) -> bool {
    match (field, criterion) {
        (_, None) => true,
        (None, Some(_)) => true,
        (Some(field), Some(criterion)) => field.to_lowercase().contains(criterion),
    }
}
