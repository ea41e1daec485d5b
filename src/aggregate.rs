//! Scan entry point: dispatches files to scanners and merges their output.

use crate::config::{Config, IgnoreConfig};
use crate::error::{Error, Result};
use crate::model::{sort_dependencies, Dependency, Ecosystem, ScanSession, ScannedFile, SkippedFile};
use crate::registry::RegistryLookup;
use crate::scanner::{all_scanners, ManifestScanner};
use crate::walker::discover_manifests;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deduplicating collection keyed by `(name, version)`.
///
/// The first record seen for a key is kept; later ones are ignored.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashSet<(String, String)>,
    deps: Vec<Dependency>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record. Returns false if its key was already present.
    pub fn insert(&mut self, dep: Dependency) -> bool {
        if !self.seen.insert((dep.name.clone(), dep.version.clone())) {
            return false;
        }
        self.deps.push(dep);
        true
    }

    /// Inserts every record, tagged with `ecosystem`.
    pub fn merge(&mut self, deps: Vec<Dependency>, ecosystem: Ecosystem) {
        for dep in deps {
            self.insert(dep.with_ecosystem(ecosystem));
        }
    }

    /// Consumes the aggregator, returning records in output order.
    pub fn into_sorted(self) -> Vec<Dependency> {
        let mut deps = self.deps;
        sort_dependencies(&mut deps);
        deps
    }
}

/// Scans files or directory trees for dependencies.
///
/// # Example
///
/// ```no_run
/// use depscan::{Config, DependencyScanner};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load()?;
///     let scanner = DependencyScanner::new(&config, Arc::new(config.registry()?));
///     let session = scanner.scan(Path::new(".")).await?;
///     for dep in &session.dependencies {
///         println!("{}@{}", dep.name, dep.version);
///     }
///     Ok(())
/// }
/// ```
pub struct DependencyScanner {
    scanners: Vec<Box<dyn ManifestScanner>>,
    ignore: IgnoreConfig,
}

impl DependencyScanner {
    pub fn new(config: &Config, registry: Arc<dyn RegistryLookup>) -> Self {
        Self {
            scanners: all_scanners(config, registry),
            ignore: config.ignore.clone(),
        }
    }

    pub fn with_scanners(scanners: Vec<Box<dyn ManifestScanner>>, ignore: IgnoreConfig) -> Self {
        Self { scanners, ignore }
    }

    fn scanner_for(&self, path: &Path) -> Option<&dyn ManifestScanner> {
        self.scanners
            .iter()
            .find(|s| s.can_scan(path))
            .map(|s| s.as_ref())
    }

    /// Scans a single manifest file or a whole directory tree.
    ///
    /// # Errors
    ///
    /// - [`Error::PathNotFound`] / [`Error::InvalidPath`] for a bad path
    /// - [`Error::UnsupportedFile`] for a file with an unrecognized name
    /// - any parse error of a single file passed directly
    ///
    /// Failures on individual files inside a directory are not errors; they
    /// are logged and listed in [`ScanSession::skipped`].
    pub async fn scan(&self, path: &Path) -> Result<ScanSession> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::PathNotFound(path.to_path_buf()),
            _ => Error::io(path, e),
        })?;

        let session = if metadata.is_file() {
            self.scan_file(path).await?
        } else if metadata.is_dir() {
            self.scan_directory(path).await
        } else {
            return Err(Error::InvalidPath(path.to_path_buf()));
        };

        info!(
            path = %path.display(),
            files = session.files.len(),
            skipped = session.skipped.len(),
            dependencies = session.len(),
            "scan complete"
        );
        Ok(session)
    }

    async fn scan_file(&self, path: &Path) -> Result<ScanSession> {
        let scanner = self
            .scanner_for(path)
            .ok_or_else(|| Error::UnsupportedFile(path.to_path_buf()))?;

        let mut session = ScanSession::new(path);
        let mut aggregator = Aggregator::new();

        let deps = scanner.scan(path).await?;
        session.files.push(ScannedFile {
            path: path.to_path_buf(),
            ecosystem: scanner.ecosystem(),
            dependency_count: deps.len(),
        });
        aggregator.merge(deps, scanner.ecosystem());

        session.dependencies = aggregator.into_sorted();
        Ok(session)
    }

    async fn scan_directory(&self, root: &Path) -> ScanSession {
        let mut session = ScanSession::new(root);
        let mut aggregator = Aggregator::new();

        for path in discover_manifests(root, &self.ignore) {
            let Some(scanner) = self.scanner_for(&path) else {
                continue;
            };

            debug!(path = %path.display(), scanner = scanner.name(), "scanning");
            match scanner.scan(&path).await {
                Ok(deps) => {
                    session.files.push(ScannedFile {
                        path: path.clone(),
                        ecosystem: scanner.ecosystem(),
                        dependency_count: deps.len(),
                    });
                    aggregator.merge(deps, scanner.ecosystem());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse, skipping");
                    session.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        session.dependencies = aggregator.into_sorted();
        session
    }
}
