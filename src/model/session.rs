use super::{Dependency, Ecosystem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A manifest or lockfile that was parsed during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub ecosystem: Ecosystem,
    /// Records the file produced before cross-file deduplication.
    pub dependency_count: usize,
}

/// A file that was discovered but could not be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// The outcome of one scan.
///
/// Owned by the caller; nothing is kept between scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedFile>,
    pub dependencies: Vec<Dependency>,
}

impl ScanSession {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            started_at: Utc::now(),
            files: Vec::new(),
            skipped: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn by_ecosystem(&self, ecosystem: Ecosystem) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |d| d.ecosystem == ecosystem)
    }
}
