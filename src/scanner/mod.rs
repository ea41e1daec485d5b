//! Manifest and lockfile scanners.
//!
//! This module provides the [`ManifestScanner`] trait and one implementation
//! per recognized file name.
//!
//! # Available Scanners
//!
//! | Scanner | File | Ecosystem |
//! |---------|------|-----------|
//! | [`PackageLockScanner`] | `package-lock.json` | npm |
//! | [`PackageJsonScanner`] | `package.json` | npm |
//! | [`YarnLockScanner`] | `yarn.lock` | npm |
//! | [`RequirementsScanner`] | `requirements.txt` | PyPI |
//!
//! # Example
//!
//! ```no_run
//! use depscan::scanner::{ManifestScanner, PackageLockScanner};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> depscan::Result<()> {
//!     let deps = PackageLockScanner.scan(Path::new("package-lock.json")).await?;
//!     for dep in deps {
//!         println!("{}@{}", dep.name, dep.version);
//!     }
//!     Ok(())
//! }
//! ```

mod npm;
mod requirements;
mod source;
mod yarn;

pub use npm::{parse_package_json, parse_package_lock, PackageJsonScanner, PackageLockScanner};
pub use requirements::{parse_requirement_line, parse_requirements, Requirement, RequirementsScanner};
pub use source::{classify_source, is_strong_integrity};
pub use yarn::{parse_yarn_lock, YarnLockScanner};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Dependency, Ecosystem};
use crate::registry::RegistryLookup;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// File names a scanner exists for.
pub const KNOWN_FILE_NAMES: &[&str] = &[
    npm::PACKAGE_JSON,
    npm::PACKAGE_LOCK,
    yarn::YARN_LOCK,
    requirements::REQUIREMENTS_TXT,
];

/// Trait for extracting dependencies from one kind of manifest file.
#[async_trait]
pub trait ManifestScanner: Send + Sync {
    /// Returns the human-readable name of this scanner.
    fn name(&self) -> &'static str;

    /// The exact base name of the files this scanner reads.
    fn file_name(&self) -> &'static str;

    /// The ecosystem every dependency from this scanner belongs to.
    fn ecosystem(&self) -> Ecosystem;

    fn can_scan(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == self.file_name())
    }

    /// Parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    async fn scan(&self, path: &Path) -> Result<Vec<Dependency>>;
}

/// Returns one scanner per recognized file name, configured from `config`.
pub fn all_scanners(
    config: &Config,
    registry: Arc<dyn RegistryLookup>,
) -> Vec<Box<dyn ManifestScanner>> {
    vec![
        Box::new(PackageJsonScanner),
        Box::new(PackageLockScanner),
        Box::new(YarnLockScanner),
        Box::new(
            RequirementsScanner::new(registry)
                .with_lookup_delay(config.lookup_delay())
                .with_transitive(config.expand_transitive),
        ),
    ]
}

/// Returns true if `path` has one of the [`KNOWN_FILE_NAMES`].
pub fn is_known_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| KNOWN_FILE_NAMES.contains(&name))
}

/// Leading byte-order mark some Windows editors write.
pub(crate) const BYTE_ORDER_MARK: char = '\u{feff}';

/// Reads a manifest as UTF-8 with any byte-order mark removed.
pub(crate) fn read_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    match content.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => Ok(rest.to_string()),
        None => Ok(content),
    }
}
