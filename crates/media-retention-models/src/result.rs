use crate::media::MediaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of evaluating one item in one cycle.
///
/// Only `Queued` carries a removal countdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Skipped { reason: String },
    Queued { reason: String, days_until: u32 },
    Removed { reason: String },
    DryRunRemove { reason: String },
    Error { reason: String },
}

impl Action {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Action::Skipped { reason: reason.into() }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Action::Error { reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        match self {
            Action::Skipped { reason }
            | Action::Queued { reason, .. }
            | Action::Removed { reason }
            | Action::DryRunRemove { reason }
            | Action::Error { reason } => reason,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Skipped { .. } => "skipped",
            Action::Queued { .. } => "queued",
            Action::Removed { .. } => "removed",
            Action::DryRunRemove { .. } => "dry_run_remove",
            Action::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaResult {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub title: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(flatten)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_on_disk: Option<u64>,
}

impl MediaResult {
    /// Title with the release year appended when known.
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) if year > 0 => format!("{} ({})", self.title, year),
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaStats {
    pub scanned: usize,
    pub marked_for_queue: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Everything one reconciliation cycle produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessingResult {
    pub stats: BTreeMap<MediaType, MediaStats>,
    pub results: Vec<MediaResult>,
    pub errors: usize,
}

impl ProcessingResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scanned(&mut self, media_type: MediaType, count: usize) {
        self.stats.entry(media_type).or_default().scanned += count;
    }

    /// Record an error that is not attached to a single item.
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    pub fn record(&mut self, result: MediaResult) {
        let stats = self.stats.entry(result.media_type).or_default();
        match result.action {
            Action::Queued { .. } => stats.marked_for_queue += 1,
            Action::Removed { .. } | Action::DryRunRemove { .. } => stats.removed += 1,
            Action::Skipped { .. } => stats.skipped += 1,
            Action::Error { .. } => self.errors += 1,
        }
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = MediaResult>) {
        for result in results {
            self.record(result);
        }
    }

    pub fn totals(&self) -> MediaStats {
        self.stats.values().fold(MediaStats::default(), |acc, s| MediaStats {
            scanned: acc.scanned + s.scanned,
            marked_for_queue: acc.marked_for_queue + s.marked_for_queue,
            removed: acc.removed + s.removed,
            skipped: acc.skipped + s.skipped,
        })
    }

    pub fn results_for(&self, media_type: MediaType) -> impl Iterator<Item = &MediaResult> {
        self.results.iter().filter(move |r| r.media_type == media_type)
    }
}
