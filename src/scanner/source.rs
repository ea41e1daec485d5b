//! Origin and integrity classification for npm-family lockfile entries.

use crate::model::SourceType;

/// Registry hosts whose tarball URLs count as [`SourceType::Registry`].
const REGISTRY_PREFIXES: &[&str] = &["https://registry.npmjs.org/", "https://registry.yarnpkg.com/"];

/// Integrity tag of the strong hash algorithm.
const STRONG_INTEGRITY_PREFIX: &str = "sha512-";

/// Classifies a `resolved` origin string.
///
/// Rules are checked in order and the first match wins, so
/// `git+ssh://git@github.com/...` is [`SourceType::Git`], not `Github`.
pub fn classify_source(resolved: Option<&str>) -> SourceType {
    let Some(resolved) = resolved else {
        return SourceType::Unknown;
    };

    if resolved.starts_with("git+") {
        SourceType::Git
    } else if resolved.starts_with("github:") || resolved.contains("github.com") {
        SourceType::Github
    } else if resolved.starts_with("gitlab:") || resolved.contains("gitlab.com") {
        SourceType::Gitlab
    } else if resolved.starts_with("bitbucket:") || resolved.contains("bitbucket.org") {
        SourceType::Bitbucket
    } else if resolved.starts_with("svn+") {
        SourceType::Svn
    } else if resolved.starts_with("http://") {
        SourceType::Http
    } else if REGISTRY_PREFIXES.iter().any(|p| resolved.starts_with(p)) {
        SourceType::Registry
    } else if resolved.starts_with("https://") {
        SourceType::Https
    } else if resolved.starts_with("file:") {
        SourceType::File
    } else if resolved.starts_with("link:") {
        SourceType::Link
    } else {
        SourceType::Unknown
    }
}

/// True iff the integrity field is present and uses SHA-512.
pub fn is_strong_integrity(integrity: Option<&str>) -> bool {
    integrity.is_some_and(|i| i.starts_with(STRONG_INTEGRITY_PREFIX))
}
