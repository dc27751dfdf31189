//! Migration results and error report persistence

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a single element was not migrated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementError {
    /// The backend rejected the write, or the request never completed
    Failed { message: String },
    /// The source value has no entry in the lookup table. Carries the whole
    /// record so it can be fixed by hand from the report.
    Unresolvable { label: String, record: Value },
}

impl ElementError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ElementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementError::Failed { message } => write!(f, "{}", message),
            ElementError::Unresolvable { label, .. } => {
                write!(f, "No classification id mapped for '{}'", label)
            }
        }
    }
}

impl std::error::Error for ElementError {}

impl From<anyhow::Error> for ElementError {
    fn from(err: anyhow::Error) -> Self {
        Self::failed(format!("{:#}", err))
    }
}

/// Outcome of running a batch over a set of elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    /// Failed element id -> error
    pub errors: BTreeMap<String, ElementError>,
}

impl BatchOutcome {
    /// Fold one settled invocation into the outcome
    pub fn record(&mut self, id: String, result: Result<(), ElementError>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(err) => {
                log::warn!("{}: {}", id, err);
                if let Some(previous) = self.errors.insert(id.clone(), err) {
                    log::warn!("Duplicate id {} in batch, earlier error was: {}", id, previous);
                }
            }
        }
    }
}

/// Result of one migration task
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub task: String,
    pub dry_run: bool,
    /// Records returned by the collection step
    pub total_records: usize,
    /// Records skipped because they already carry the target field
    pub already_migrated: usize,
    /// Records left alone because they have no source value to derive from
    pub unclassifiable: usize,
    pub candidates: usize,
    pub updated: usize,
    pub errors: BTreeMap<String, ElementError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationResult {
    pub fn new(task: impl Into<String>, dry_run: bool) -> Self {
        Self {
            task: task.into(),
            dry_run,
            total_records: 0,
            already_migrated: 0,
            unclassifiable: 0,
            candidates: 0,
            updated: 0,
            errors: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Merge a batch outcome and stamp the finish time
    pub fn finish(mut self, outcome: BatchOutcome) -> Self {
        self.updated = outcome.succeeded;
        self.errors = outcome.errors;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Stamp the finish time without a batch (dry runs, empty candidate sets)
    pub fn finish_without_batch(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Destination for candidate lists and final results
pub trait ReportSink: Send + Sync {
    /// Record the ids a task is about to mutate
    fn record_candidates(&self, task: &str, ids: &[String]) -> Result<()>;

    /// Record a finished task result
    fn record_result(&self, result: &MigrationResult) -> Result<()>;
}

/// Writes reports as pretty JSON files into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    stamp: String,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stamp: Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create report directory {}", self.dir.display()))?;

        let path = self.dir.join(format!("{}-{}.json", name, self.stamp));
        let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        log::info!("Report written to {}", path.display());
        Ok(path)
    }
}

impl ReportSink for ReportWriter {
    fn record_candidates(&self, task: &str, ids: &[String]) -> Result<()> {
        self.write_json(&format!("{}-candidates", task), ids)?;
        Ok(())
    }

    fn record_result(&self, result: &MigrationResult) -> Result<()> {
        self.write_json(&result.task, result)?;
        Ok(())
    }
}
