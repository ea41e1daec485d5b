//! Extracts a canonical, deduplicated list of package identities from npm
//! and PyPI manifests and lockfiles.
//!
//! Recognized files: `package.json`, `package-lock.json` (both schema
//! generations), `yarn.lock` and `requirements.txt`. Pass a single file or a
//! directory to [`DependencyScanner::scan`]; the result is a
//! [`ScanSession`] holding the merged list, sorted by name then version.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod scanner;
pub mod version;
pub mod walker;

pub use aggregate::{Aggregator, DependencyScanner};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{Dependency, Ecosystem, ScanSession, SourceType};
pub use registry::{PypiRegistry, RegistryLookup};
pub use scanner::ManifestScanner;
