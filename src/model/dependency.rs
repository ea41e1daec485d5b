use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sentinel version for a dependency declared without any version specifier.
pub const UNVERSIONED: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    #[serde(rename = "npm")]
    Npm,
    #[serde(rename = "PyPI")]
    PyPI,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Ecosystem {
    /// The ecosystem name as used by OSV.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an npm-family package was resolved from, derived from its
/// `resolved` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Registry,
    Git,
    Github,
    Gitlab,
    Bitbucket,
    Svn,
    Http,
    Https,
    File,
    Link,
    Unknown,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Registry => "registry",
            SourceType::Git => "git",
            SourceType::Github => "github",
            SourceType::Gitlab => "gitlab",
            SourceType::Bitbucket => "bitbucket",
            SourceType::Svn => "svn",
            SourceType::Http => "http",
            SourceType::Https => "https",
            SourceType::File => "file",
            SourceType::Link => "link",
            SourceType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single package identity.
///
/// Two dependencies are the same entry when their `(name, version)` pair
/// matches; see [`Dependency::key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_is_strong: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            source_type: None,
            integrity_is_strong: None,
            resolved_url: None,
        }
    }

    /// Attaches the lockfile's origin data: `source_type` is classified from
    /// `resolved` and `integrity_is_strong` from `integrity`.
    pub fn with_resolution(mut self, resolved: Option<&str>, integrity: Option<&str>) -> Self {
        self.source_type = Some(crate::scanner::classify_source(resolved));
        self.integrity_is_strong = Some(crate::scanner::is_strong_integrity(integrity));
        self.resolved_url = resolved.map(str::to_string);
        self
    }

    pub fn with_ecosystem(mut self, ecosystem: Ecosystem) -> Self {
        self.ecosystem = ecosystem;
        self
    }

    /// The uniqueness key.
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.version)
    }
}

/// Output ordering: name (case-insensitive, then exact), then version.
///
/// Versions that parse as semver sort first, by precedence. The rest
/// (`2.0`, `*`, ...) follow in lexical order.
pub fn compare_dependencies(a: &Dependency, b: &Dependency) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| compare_versions(&a.version, &b.version))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sorts a dependency list into output order.
pub fn sort_dependencies(deps: &mut [Dependency]) {
    deps.sort_by(compare_dependencies);
}
