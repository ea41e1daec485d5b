//! `yarn.lock` scanner.
//!
//! The format is indented text, one block per resolved package:
//!
//! ```text
//! "@babel/core@^7.0.0", "@babel/core@^7.1.0":
//!   version "7.22.5"
//!   resolved "https://registry.yarnpkg.com/@babel/core/-/core-7.22.5.tgz#..."
//! ```
//!
//! Only names and versions are read. Origin and integrity lines differ too
//! much between yarn releases to classify reliably.

use super::read_file;
use crate::error::Result;
use crate::model::{Dependency, Ecosystem};
use async_trait::async_trait;
use std::path::Path;

pub const YARN_LOCK: &str = "yarn.lock";

pub struct YarnLockScanner;

#[derive(Debug, Clone, PartialEq, Eq)]
enum YarnState {
    AwaitingHeader,
    InBlock { name: String },
}

#[async_trait]
impl super::ManifestScanner for YarnLockScanner {
    fn name(&self) -> &'static str {
        "yarn lockfile"
    }

    fn file_name(&self) -> &'static str {
        YARN_LOCK
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    async fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let content = read_file(path)?;
        Ok(parse_yarn_lock(&content))
    }
}

pub fn parse_yarn_lock(content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut state = YarnState::AwaitingHeader;

    for line in content.lines() {
        let (next, emitted) = transition(state, line);
        state = next;
        if let Some((name, version)) = emitted {
            deps.push(Dependency::new(name, version, Ecosystem::Npm));
        }
    }

    deps
}

fn transition(state: YarnState, line: &str) -> (YarnState, Option<(String, String)>) {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return (state, None);
    }

    let indented = line.starts_with(char::is_whitespace);
    if !indented {
        return match header_name(trimmed) {
            Some(name) => (YarnState::InBlock { name }, None),
            None => (YarnState::AwaitingHeader, None),
        };
    }

    match state {
        YarnState::InBlock { name } => match version_value(trimmed) {
            Some(version) => (YarnState::AwaitingHeader, Some((name, version))),
            None => (YarnState::InBlock { name }, None),
        },
        YarnState::AwaitingHeader => (YarnState::AwaitingHeader, None),
    }
}

/// Name of the first specifier on a block header, e.g. `@babel/core` from
/// `"@babel/core@^7.0.0", "@babel/core@^7.1.0":`.
fn header_name(line: &str) -> Option<String> {
    let specifiers = line.strip_suffix(':')?;
    let first = specifiers.split(',').next()?.trim().trim_matches('"');

    // Skip index 0 so a scope's leading '@' is not taken as the separator.
    let separator = first.get(1..)?.find('@')? + 1;
    let (name, range) = (&first[..separator], &first[separator + 1..]);
    if name.is_empty() || range.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name.to_string())
}

/// Accepts `version "1.2.3"`, `version: "1.2.3"` and `version: 1.2.3`.
fn version_value(line: &str) -> Option<String> {
    let rest = line.strip_prefix("version")?;
    if !rest.starts_with([' ', '\t', ':']) {
        return None;
    }
    let value = rest.trim_start_matches(':').trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const YARN_V1: &str = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


"@babel/core@^7.0.0", "@babel/core@^7.1.0":
  version "7.22.5"
  resolved "https://registry.yarnpkg.com/@babel/core/-/core-7.22.5.tgz#abc"
  integrity sha512-SBuTAjg91A3eKOvD+bPEz3LlhHZRNu1nFOVts9lzDJTXshHTjII0BAtDS3Y2DAkdZdDKWVZGVwkDfc4Clxn1dg==
  dependencies:
    "@ampproject/remapping" "^2.2.0"

lodash@^4.17.20, lodash@^4.17.21:
  version "4.17.21"
  resolved "https://registry.yarnpkg.com/lodash/-/lodash-4.17.21.tgz#679591c564c3bffaae8454cf0b3df370c3d6911c"

debug@2.6.9:

  # comment inside a block
  version "2.6.9"
"#;

    #[test]
    fn test_parse_yarn_v1() {
        let deps = parse_yarn_lock(YARN_V1);
        let keys: Vec<_> = deps.iter().map(|d| d.key()).collect();
        assert_eq!(
            keys,
            vec![
                ("@babel/core", "7.22.5"),
                ("lodash", "4.17.21"),
                ("debug", "2.6.9"),
            ]
        );
        assert!(deps.iter().all(|d| d.source_type.is_none()));
        assert!(deps.iter().all(|d| d.integrity_is_strong.is_none()));
    }

    #[test]
    fn test_parse_yarn_berry() {
        let content = r#"__metadata:
  version: 6
  cacheKey: 8

"lodash@npm:^4.17.21":
  version: 4.17.21
  resolution: "lodash@npm:4.17.21"
"#;
        let deps = parse_yarn_lock(content);
        let keys: Vec<_> = deps.iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec![("lodash", "4.17.21")]);
    }

    #[test]
    fn test_nested_version_fields_do_not_emit_twice() {
        let content = "a@^1.0.0:\n  version \"1.0.0\"\n  dependencies:\n    version \"9.9.9\"\n";
        let deps = parse_yarn_lock(content);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].key(), ("a", "1.0.0"));
    }

    #[test]
    fn test_transition_ignores_blank_and_comment_lines() {
        let state = YarnState::InBlock {
            name: "a".to_string(),
        };
        let (next, emitted) = transition(state.clone(), "   ");
        assert_eq!(next, state);
        assert!(emitted.is_none());

        let (next, _) = transition(state.clone(), "# note");
        assert_eq!(next, state);
    }

    #[test]
    fn test_unindented_non_header_resets_state() {
        let state = YarnState::InBlock {
            name: "a".to_string(),
        };
        let (next, _) = transition(state, "__metadata:");
        assert_eq!(next, YarnState::AwaitingHeader);
    }

    #[test]
    fn test_header_name() {
        assert_eq!(header_name("lodash@^4.17.21:").as_deref(), Some("lodash"));
        assert_eq!(
            header_name("\"@types/node@*\", \"@types/node@^20\":").as_deref(),
            Some("@types/node")
        );
        assert_eq!(header_name("__metadata:"), None);
        assert_eq!(header_name("lodash@^4.17.21"), None);
        assert_eq!(header_name("@scope:"), None);
    }
}
