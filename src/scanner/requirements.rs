//! `requirements.txt` scanner.
//!
//! Direct dependencies come from the file itself. Each one pinned to a
//! usable version is then expanded by exactly one level: the registry is
//! asked what that release requires, and those requirements are added
//! unless a dependency of the same name is already known.

use super::{read_file, BYTE_ORDER_MARK};
use crate::error::Result;
use crate::model::{sort_dependencies, Dependency, Ecosystem, UNVERSIONED};
use crate::registry::RegistryLookup;
use crate::version::normalize;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

pub const REQUIREMENTS_TXT: &str = "requirements.txt";

/// Prefixes of VCS and URL references, which carry no registry identity.
const DIRECT_REFERENCE_PREFIXES: &[&str] = &[
    "git+", "hg+", "svn+", "bzr+", "http://", "https://", "file:",
];

const SPECIFIER_START: &[char] = &['=', '<', '>', '!', '~'];

static REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*(.*)$")
        .expect("valid regex")
});

/// A requirement line reduced to its name and raw version specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    /// Specifier with whitespace removed, or `"*"` when none was given.
    pub specifier: String,
}

pub struct RequirementsScanner {
    registry: Arc<dyn RegistryLookup>,
    lookup_delay: Duration,
    expand_transitive: bool,
}

impl RequirementsScanner {
    pub fn new(registry: Arc<dyn RegistryLookup>) -> Self {
        Self {
            registry,
            lookup_delay: Duration::from_secs(1),
            expand_transitive: true,
        }
    }

    /// Pause inserted between consecutive registry lookups.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn with_transitive(mut self, expand: bool) -> Self {
        self.expand_transitive = expand;
        self
    }

    /// Parses requirements text and expands it through the registry.
    pub async fn resolve(&self, content: &str) -> Vec<Dependency> {
        let direct = parse_requirements(content);
        let mut accumulated = Accumulator::default();

        for req in &direct {
            accumulated.insert(Dependency::new(
                &req.name,
                version_for(&req.specifier),
                Ecosystem::PyPI,
            ));
        }

        if self.expand_transitive {
            self.expand(&direct, &mut accumulated).await;
        }

        let mut deps = accumulated.deps;
        sort_dependencies(&mut deps);
        deps
    }

    async fn expand(&self, direct: &[Requirement], accumulated: &mut Accumulator) {
        let mut first_lookup = true;

        for req in direct {
            if req.specifier == UNVERSIONED {
                continue;
            }
            let Some(version) = normalize(&req.specifier) else {
                debug!(package = %req.name, specifier = %req.specifier, "cannot normalize, not expanding");
                continue;
            };

            if !first_lookup && !self.lookup_delay.is_zero() {
                tokio::time::sleep(self.lookup_delay).await;
            }
            first_lookup = false;

            let requirements = match self.registry.requirements(&req.name, &version).await {
                Ok(requirements) => requirements,
                Err(e) => {
                    warn!(package = %req.name, version = %version, error = %e, "registry lookup failed, skipping expansion");
                    continue;
                }
            };

            for raw in requirements {
                let without_marker = raw.split(';').next().unwrap_or_default();
                let Some(transitive) = parse_requirement_line(without_marker) else {
                    continue;
                };
                if accumulated.has_name(&transitive.name) {
                    continue;
                }
                accumulated.insert(Dependency::new(
                    transitive.name,
                    version_for(&transitive.specifier),
                    Ecosystem::PyPI,
                ));
            }
        }
    }
}

#[async_trait]
impl super::ManifestScanner for RequirementsScanner {
    fn name(&self) -> &'static str {
        "pip requirements"
    }

    fn file_name(&self) -> &'static str {
        REQUIREMENTS_TXT
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPI
    }

    async fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let content = read_file(path)?;
        Ok(self.resolve(&content).await)
    }
}

/// Records keyed by `(name, version)`, with the canonical names seen so far.
#[derive(Default)]
struct Accumulator {
    deps: Vec<Dependency>,
    keys: HashSet<(String, String)>,
    names: HashSet<String>,
}

impl Accumulator {
    fn insert(&mut self, dep: Dependency) {
        self.names.insert(canonical_name(&dep.name));
        if self.keys.insert((dep.name.clone(), dep.version.clone())) {
            self.deps.push(dep);
        }
    }

    fn has_name(&self, name: &str) -> bool {
        self.names.contains(&canonical_name(name))
    }
}

/// Version recorded for a specifier: the normalized version, or the
/// unversioned sentinel when there is none.
fn version_for(specifier: &str) -> String {
    if specifier == UNVERSIONED {
        return UNVERSIONED.to_string();
    }
    normalize(specifier).unwrap_or_else(|| UNVERSIONED.to_string())
}

/// PEP 503 name normalization: `Foo_Bar.baz` -> `foo-bar-baz`.
fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_sep {
                out.push('-');
            }
            last_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_sep = false;
        }
    }
    out
}

pub fn parse_requirements(content: &str) -> Vec<Requirement> {
    content
        .trim_start_matches(BYTE_ORDER_MARK)
        .lines().filter_map(parse_requirement_line).collect()
}

/// Recognizes one requirement line.
///
/// Comments, option lines (`-r`, `--index-url`, ...) and VCS/URL references
/// yield `None`. Environment markers and extras are dropped.
pub fn parse_requirement_line(line: &str) -> Option<Requirement> {
    let line = match line.find(" #") {
        Some(pos) => &line[..pos],
        None => line,
    };
    let line = line.split(';').next().unwrap_or_default().trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }

    let lower = line.to_ascii_lowercase();
    if DIRECT_REFERENCE_PREFIXES.iter().any(|p| lower.starts_with(p)) || line.contains('@') {
        return None;
    }

    let caps = REQUIREMENT.captures(line)?;
    let name = caps.get(1)?.as_str().to_string();
    let specifier: String = caps
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect();

    if specifier.is_empty() {
        return Some(Requirement {
            name,
            specifier: UNVERSIONED.to_string(),
        });
    }
    if !specifier.starts_with(SPECIFIER_START) {
        return None;
    }

    Some(Requirement { name, specifier })
}
