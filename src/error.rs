//! Error types for depscan.
//!
//! Only hard failures are errors. "No version specifier" and "cannot
//! normalize" are ordinary values (`"*"` and `None`), and recoverable
//! failures during a directory scan are logged and recorded in the
//! [`ScanSession`](crate::ScanSession) instead of being returned.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the depscan [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A file or directory could not be read.
    #[error("io error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON manifest or lockfile is malformed.
    #[error("json parse error: {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A file was passed directly but its name is not a recognized manifest.
    #[error("unsupported file: {0} (expected package.json, package-lock.json, yarn.lock or requirements.txt)")]
    UnsupportedFile(PathBuf),

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// The path exists but is neither a regular file nor a directory.
    #[error("not a file or directory: {0}")]
    InvalidPath(PathBuf),

    /// The registry has no record of this exact release.
    #[error("package {name}=={version} not found in registry")]
    PackageNotFound { name: String, version: String },

    #[error("registry error: {0}")]
    Registry(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}
