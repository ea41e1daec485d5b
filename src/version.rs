//! Version constraint normalization.
//!
//! Turns a range or wildcard specifier into a single best-effort exact
//! version. This is not a resolver: when a lower bound exists it always
//! wins, giving the oldest plausible version.

use regex::Regex;
use std::sync::LazyLock;

const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!', '~', '*', ','];

static NUMERIC_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid regex"));

/// Normalizes a version specifier to an exact version.
///
/// Returns `None` when nothing usable can be extracted. Callers must treat
/// that as "do not expand", not as version zero.
///
/// ```
/// use depscan::version::normalize;
///
/// assert_eq!(normalize("2.*").as_deref(), Some("2.0.0"));
/// assert_eq!(normalize(">=1.7.4,!=1.8.1,<3.0.0").as_deref(), Some("1.7.4"));
/// assert_eq!(normalize("==1.2.3").as_deref(), Some("1.2.3"));
/// assert_eq!(normalize("~=abc"), None);
/// ```
pub fn normalize(spec: &str) -> Option<String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }

    if !spec.contains(OPERATOR_CHARS) {
        return Some(spec.to_string());
    }

    if spec.contains('*') {
        return normalize_wildcard(spec);
    }

    let clauses: Vec<&str> = spec.split(',').map(str::trim).collect();

    // Lower bound first, then exact pin, then anything numeric.
    let lower_bound = clauses.iter().find_map(|clause| {
        let value = clause
            .strip_prefix(">=")
            .or_else(|| clause.strip_prefix('>'))?;
        numeric_prefix(value)
    });
    if lower_bound.is_some() {
        return lower_bound;
    }

    let pinned = clauses.iter().find_map(|clause| {
        let value = clause.strip_prefix("==")?.trim_start_matches('=');
        numeric_prefix(value)
    });
    if pinned.is_some() {
        return pinned;
    }

    clauses
        .iter()
        .find_map(|clause| NUMERIC_VERSION.find(clause))
        .map(|m| m.as_str().to_string())
}

fn normalize_wildcard(spec: &str) -> Option<String> {
    let clause = spec.split(',').map(str::trim).find(|c| c.contains('*'))?;
    let bare = clause.trim_start_matches(|c: char| OPERATOR_CHARS.contains(&c) && c != '*');
    if bare.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = bare
        .split('.')
        .map(|segment| if segment == "*" { "0" } else { segment })
        .collect();
    while segments.len() < 3 {
        segments.push("0");
    }
    Some(segments.join("."))
}

fn numeric_prefix(value: &str) -> Option<String> {
    let value = value.trim();
    NUMERIC_VERSION
        .find(value)
        .filter(|m| m.start() == 0)
        .map(|m| m.as_str().to_string())
}
