use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use media_retention_models::ProcessingResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// The finished result of one reconciliation cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub result: ProcessingResult,
}

impl CycleReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Holds the last completed cycle and mirrors it to disk.
///
/// Only whole reports are published, so readers never see a cycle in progress.
pub struct ReportStore {
    path: Option<PathBuf>,
    last: RwLock<Option<CycleReport>>,
}

impl ReportStore {
    /// Open the store, seeding it with the report a previous process left behind.
    pub fn open(path: PathBuf) -> Self {
        let last = match load_report(&path) {
            Ok(report) => report,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable last report");
                None
            }
        };
        Self {
            path: Some(path),
            last: RwLock::new(last),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            last: RwLock::new(None),
        }
    }

    pub fn publish(&self, report: CycleReport) {
        if let Some(path) = &self.path {
            match save_report(path, &report) {
                Ok(()) => debug!(path = %path.display(), "Saved last report"),
                Err(e) => warn!(
                    operation = "report_save",
                    path = %path.display(),
                    error = %e,
                    "Failed to save last report"
                ),
            }
        }
        *self.last.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(report);
    }

    pub fn last(&self) -> Option<CycleReport> {
        self.last
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Read a persisted report; a missing file is `Ok(None)`.
pub fn load_report(path: &Path) -> Result<Option<CycleReport>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report file: {:?}", path))?;
    let report = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report file: {:?}", path))?;
    Ok(Some(report))
}

fn save_report(path: &Path, report: &CycleReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, json)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
