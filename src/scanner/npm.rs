//! `package-lock.json` and `package.json` scanners.
//!
//! `package-lock.json` comes in two schema generations:
//!
//! ```json
//! { "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "app", "version": "1.0.0" },
//!     "node_modules/lodash": { "version": "4.17.21", "resolved": "...", "integrity": "sha512-..." } } }
//! ```
//!
//! ```json
//! { "lockfileVersion": 1,
//!   "dependencies": {
//!     "express": { "version": "4.18.2",
//!       "dependencies": { "debug": { "version": "2.6.9" } } } } }
//! ```

use super::read_file;
use crate::error::{Error, Result};
use crate::model::{Dependency, Ecosystem};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const PACKAGE_LOCK: &str = "package-lock.json";
pub const PACKAGE_JSON: &str = "package.json";

const INSTALL_DIR_MARKER: &str = "node_modules/";

pub struct PackageLockScanner;

pub struct PackageJsonScanner;

#[derive(Deserialize)]
struct PackageLock {
    #[serde(default, rename = "lockfileVersion")]
    lockfile_version: Option<u32>,
    #[serde(default)]
    packages: BTreeMap<String, FlatEntry>,
    #[serde(default)]
    dependencies: BTreeMap<String, NestedEntry>,
}

#[derive(Deserialize)]
struct FlatEntry {
    name: Option<String>,
    version: Option<String>,
    resolved: Option<String>,
    integrity: Option<String>,
}

#[derive(Deserialize)]
struct NestedEntry {
    version: Option<String>,
    resolved: Option<String>,
    integrity: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, NestedEntry>,
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "peerDependencies")]
    peer_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "optionalDependencies")]
    optional_dependencies: Option<BTreeMap<String, String>>,
}

#[async_trait]
impl super::ManifestScanner for PackageLockScanner {
    fn name(&self) -> &'static str {
        "npm lockfile"
    }

    fn file_name(&self) -> &'static str {
        PACKAGE_LOCK
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    async fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let content = read_file(path)?;
        parse_package_lock(&content, path)
    }
}

#[async_trait]
impl super::ManifestScanner for PackageJsonScanner {
    fn name(&self) -> &'static str {
        "npm manifest"
    }

    fn file_name(&self) -> &'static str {
        PACKAGE_JSON
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    async fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let lock_path = path.with_file_name(PACKAGE_LOCK);
        if lock_path.is_file() {
            match read_file(&lock_path).and_then(|c| parse_package_lock(&c, &lock_path)) {
                Ok(deps) => return Ok(deps),
                Err(e) => {
                    debug!(
                        path = %lock_path.display(),
                        error = %e,
                        "sibling lockfile unusable, falling back to declared ranges"
                    );
                }
            }
        }

        let content = read_file(path)?;
        parse_package_json(&content, path)
    }
}

/// Parses a `package-lock.json`, picking the schema by `lockfileVersion`.
pub fn parse_package_lock(content: &str, path: &Path) -> Result<Vec<Dependency>> {
    let lock: PackageLock = serde_json::from_str(content).map_err(|e| Error::json(path, e))?;

    if lock.lockfile_version.unwrap_or(1) >= 2 && !lock.packages.is_empty() {
        Ok(parse_flat(&lock.packages))
    } else {
        Ok(parse_nested(&lock.dependencies))
    }
}

fn parse_flat(packages: &BTreeMap<String, FlatEntry>) -> Vec<Dependency> {
    packages
        .iter()
        .filter(|(install_path, _)| !install_path.is_empty())
        .filter_map(|(install_path, entry)| {
            let version = entry.version.as_deref()?;
            let name = entry
                .name
                .clone()
                .unwrap_or_else(|| package_name_from_path(install_path).to_string());

            Some(
                Dependency::new(name, version, Ecosystem::Npm)
                    .with_resolution(entry.resolved.as_deref(), entry.integrity.as_deref()),
            )
        })
        .collect()
}

/// Depth-first walk of the v1 tree with an explicit stack.
fn parse_nested(dependencies: &BTreeMap<String, NestedEntry>) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut stack: Vec<(&str, &NestedEntry)> = dependencies
        .iter()
        .rev()
        .map(|(name, entry)| (name.as_str(), entry))
        .collect();

    while let Some((name, entry)) = stack.pop() {
        if let Some(version) = entry.version.as_deref() {
            deps.push(
                Dependency::new(name, version, Ecosystem::Npm)
                    .with_resolution(entry.resolved.as_deref(), entry.integrity.as_deref()),
            );
        }

        stack.extend(
            entry
                .dependencies
                .iter()
                .rev()
                .map(|(child, child_entry)| (child.as_str(), child_entry)),
        );
    }

    deps
}

/// `node_modules/a/node_modules/@scope/b` -> `@scope/b`.
fn package_name_from_path(install_path: &str) -> &str {
    match install_path.rfind(INSTALL_DIR_MARKER) {
        Some(pos) => &install_path[pos + INSTALL_DIR_MARKER.len()..],
        None => install_path,
    }
}

/// Emits the declared ranges of a `package.json`, unresolved.
///
/// Sections are merged in the order `dependencies`, `devDependencies`,
/// `peerDependencies`, `optionalDependencies`; a later section overrides an
/// earlier one for the same name.
pub fn parse_package_json(content: &str, path: &Path) -> Result<Vec<Dependency>> {
    let manifest: PackageJson = serde_json::from_str(content).map_err(|e| Error::json(path, e))?;

    let mut declared: BTreeMap<String, String> = BTreeMap::new();
    for section in [
        manifest.dependencies,
        manifest.dev_dependencies,
        manifest.peer_dependencies,
        manifest.optional_dependencies,
    ]
    .into_iter()
    .flatten()
    {
        declared.extend(section);
    }

    Ok(declared
        .into_iter()
        .map(|(name, range)| Dependency::new(name, range, Ecosystem::Npm))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;
    use crate::scanner::ManifestScanner;
    use tempfile::TempDir;

    const FLAT_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": {
      "name": "my-app",
      "version": "1.0.0",
      "dependencies": { "express": "^4.18.2" }
    },
    "node_modules/express": {
      "version": "4.18.2",
      "resolved": "https://registry.npmjs.org/express/-/express-4.18.2.tgz",
      "integrity": "sha512-abc==",
      "dependencies": { "debug": "2.6.9" }
    },
    "node_modules/debug": {
      "version": "2.6.9",
      "resolved": "https://registry.npmjs.org/debug/-/debug-2.6.9.tgz",
      "integrity": "sha1-xyz=="
    },
    "node_modules/express/node_modules/@types/node": {
      "version": "20.1.0",
      "resolved": "git+ssh://git@github.com/types/node.git"
    },
    "node_modules/aliased": {
      "name": "real-name",
      "version": "1.0.0"
    },
    "node_modules/linked": {
      "resolved": "packages/linked",
      "link": true
    }
  }
}"#;

    const NESTED_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 1,
  "requires": true,
  "dependencies": {
    "express": {
      "version": "4.18.2",
      "resolved": "https://registry.npmjs.org/express/-/express-4.18.2.tgz",
      "integrity": "sha512-abc==",
      "requires": { "debug": "2.6.9" },
      "dependencies": {
        "@types/node": {
          "version": "20.1.0",
          "resolved": "git+ssh://git@github.com/types/node.git"
        }
      }
    },
    "debug": {
      "version": "2.6.9",
      "resolved": "https://registry.npmjs.org/debug/-/debug-2.6.9.tgz",
      "integrity": "sha1-xyz=="
    },
    "real-name": {
      "version": "1.0.0"
    }
  }
}"#;

    fn keys(deps: &[Dependency]) -> Vec<(String, String)> {
        let mut keys: Vec<_> = deps
            .iter()
            .map(|d| (d.name.clone(), d.version.clone()))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_parse_flat_lock() {
        let deps = parse_package_lock(FLAT_LOCK, Path::new("package-lock.json")).unwrap();

        assert_eq!(deps.len(), 4);
        let express = deps.iter().find(|d| d.name == "express").unwrap();
        assert_eq!(express.version, "4.18.2");
        assert_eq!(express.source_type, Some(SourceType::Registry));
        assert_eq!(express.integrity_is_strong, Some(true));

        let debug = deps.iter().find(|d| d.name == "debug").unwrap();
        assert_eq!(debug.integrity_is_strong, Some(false));

        let types = deps.iter().find(|d| d.name == "@types/node").unwrap();
        assert_eq!(types.source_type, Some(SourceType::Git));
        assert_eq!(types.integrity_is_strong, Some(false));

        assert!(deps.iter().any(|d| d.name == "real-name"));
        assert!(!deps.iter().any(|d| d.name == "my-app"));
        assert!(!deps.iter().any(|d| d.name == "linked"));
    }

    #[test]
    fn test_parse_nested_lock() {
        let deps = parse_package_lock(NESTED_LOCK, Path::new("package-lock.json")).unwrap();

        assert_eq!(deps.len(), 4);
        let types = deps.iter().find(|d| d.name == "@types/node").unwrap();
        assert_eq!(types.version, "20.1.0");
        assert_eq!(types.source_type, Some(SourceType::Git));

        let real = deps.iter().find(|d| d.name == "real-name").unwrap();
        assert_eq!(real.source_type, Some(SourceType::Unknown));
        assert_eq!(real.integrity_is_strong, Some(false));
    }

    #[test]
    fn test_schema_generations_agree() {
        let flat = parse_package_lock(FLAT_LOCK, Path::new("a")).unwrap();
        let nested = parse_package_lock(NESTED_LOCK, Path::new("b")).unwrap();
        assert_eq!(keys(&flat), keys(&nested));
    }

    #[test]
    fn test_nested_walk_handles_deep_trees() {
        let depth = 1000;
        let mut tree: BTreeMap<String, NestedEntry> = BTreeMap::new();
        for i in (0..depth).rev() {
            let entry = NestedEntry {
                version: Some(format!("1.0.{i}")),
                resolved: None,
                integrity: None,
                dependencies: std::mem::take(&mut tree),
            };
            tree.insert(format!("pkg{i}"), entry);
        }

        let deps = parse_nested(&tree);
        assert_eq!(deps.len(), depth);
        assert_eq!(deps[0].key(), ("pkg0", "1.0.0"));
        assert_eq!(deps[depth - 1].name, format!("pkg{}", depth - 1));
    }

    #[test]
    fn test_parse_nested_visits_children_of_versionless_nodes() {
        let json = r#"{
          "lockfileVersion": 1,
          "dependencies": {
            "odd": { "dependencies": { "inner": { "version": "1.0.0" } } }
          }
        }"#;
        let deps = parse_package_lock(json, Path::new("package-lock.json")).unwrap();
        assert_eq!(keys(&deps), vec![("inner".to_string(), "1.0.0".to_string())]);
    }

    #[test]
    fn test_v2_lock_prefers_packages() {
        let json = r#"{
          "lockfileVersion": 2,
          "packages": { "node_modules/a": { "version": "2.0.0" } },
          "dependencies": { "a": { "version": "1.0.0" } }
        }"#;
        let deps = parse_package_lock(json, Path::new("package-lock.json")).unwrap();
        assert_eq!(keys(&deps), vec![("a".to_string(), "2.0.0".to_string())]);
    }

    #[test]
    fn test_parse_invalid_json_returns_error() {
        let result = parse_package_lock("not json!", Path::new("package-lock.json"));
        assert!(matches!(result, Err(Error::Json { .. })));
    }

    #[test]
    fn test_package_name_from_path() {
        assert_eq!(package_name_from_path("node_modules/lodash"), "lodash");
        assert_eq!(package_name_from_path("node_modules/@types/node"), "@types/node");
        assert_eq!(
            package_name_from_path("node_modules/express/node_modules/debug"),
            "debug"
        );
        assert_eq!(package_name_from_path("packages/local"), "packages/local");
    }

    #[test]
    fn test_parse_package_json_later_sections_override() {
        let json = r#"{
          "name": "app",
          "dependencies": { "react": "^18.0.0", "lodash": "^4.17.0" },
          "devDependencies": { "jest": "^29.0.0" },
          "peerDependencies": { "react": ">=17" },
          "optionalDependencies": { "fsevents": "~2.3.2" }
        }"#;
        let deps = parse_package_json(json, Path::new("package.json")).unwrap();

        assert_eq!(deps.len(), 4);
        let react = deps.iter().find(|d| d.name == "react").unwrap();
        assert_eq!(react.version, ">=17");
        assert_eq!(react.source_type, None);
    }

    #[tokio::test]
    async fn test_package_json_prefers_sibling_lockfile() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON),
            r#"{ "dependencies": { "express": "^4.0.0" } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(PACKAGE_LOCK), FLAT_LOCK).unwrap();

        let deps = PackageJsonScanner
            .scan(&dir.path().join(PACKAGE_JSON))
            .await
            .unwrap();
        assert_eq!(deps.len(), 4);
        assert!(deps.iter().any(|d| d.key() == ("express", "4.18.2")));
    }

    #[tokio::test]
    async fn test_package_json_falls_back_on_broken_lockfile() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON),
            r#"{ "dependencies": { "express": "^4.0.0" } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(PACKAGE_LOCK), "{ broken").unwrap();

        let deps = PackageJsonScanner
            .scan(&dir.path().join(PACKAGE_JSON))
            .await
            .unwrap();
        assert_eq!(keys(&deps), vec![("express".to_string(), "^4.0.0".to_string())]);
    }
}
