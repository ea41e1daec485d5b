//! Manifest discovery under a directory tree.

use crate::config::IgnoreConfig;
use crate::scanner::is_known_file;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Installed-package directory; its contents are never scanned.
pub const DEPENDENCY_CACHE_DIR: &str = "node_modules";

const HIDDEN_MARKER: char = '.';

/// Walks `root` depth-first and returns every file with a recognized
/// manifest name, in file-name order.
///
/// `node_modules`, hidden entries and directories matching `ignore` are
/// pruned, so nothing beneath them is visited. Unreadable directories are
/// logged and skipped. Symlinks are not followed.
pub fn discover_manifests(root: &Path, ignore: &IgnoreConfig) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_pruned(entry, ignore));

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    path = %e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                    error = %e,
                    "cannot read directory entry, skipping"
                );
                continue;
            }
        };

        if entry.file_type().is_file() && is_known_file(entry.path()) {
            debug!(path = %entry.path().display(), "found manifest");
            found.push(entry.into_path());
        }
    }

    found
}

fn is_pruned(entry: &DirEntry, ignore: &IgnoreConfig) -> bool {
    let name = entry.file_name().to_string_lossy();

    let pruned = name == DEPENDENCY_CACHE_DIR
        || name.starts_with(HIDDEN_MARKER)
        || (entry.file_type().is_dir() && ignore.should_ignore_directory(&name));

    if pruned && entry.file_type().is_dir() {
        debug!(path = %entry.path().display(), "pruning directory");
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relative(root: &Path, found: &[PathBuf]) -> Vec<String> {
        found
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_discovers_known_files_recursively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "package.json");
        touch(dir.path(), "web/yarn.lock");
        touch(dir.path(), "api/requirements.txt");
        touch(dir.path(), "api/setup.py");
        touch(dir.path(), "README.md");

        let found = discover_manifests(dir.path(), &IgnoreConfig::default());
        assert_eq!(
            relative(dir.path(), &found),
            vec!["api/requirements.txt", "package.json", "web/yarn.lock"]
        );
    }

    #[test]
    fn test_prunes_cache_and_hidden_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "node_modules/lodash/package.json");
        touch(dir.path(), "app/node_modules/deep/nested/package-lock.json");
        touch(dir.path(), ".git/hooks/requirements.txt");
        touch(dir.path(), ".venv/lib/site/requirements.txt");
        touch(dir.path(), "app/package-lock.json");

        let found = discover_manifests(dir.path(), &IgnoreConfig::default());
        assert_eq!(relative(dir.path(), &found), vec!["app/package-lock.json"]);
    }

    #[test]
    fn test_prunes_configured_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "venv311/requirements.txt");
        touch(dir.path(), "src/requirements.txt");

        let ignore = IgnoreConfig {
            directories: vec!["venv*".to_string()],
        };
        let found = discover_manifests(dir.path(), &ignore);
        assert_eq!(relative(dir.path(), &found), vec!["src/requirements.txt"]);
    }

    #[test]
    fn test_hidden_root_is_still_scanned() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".project/requirements.txt");

        let found = discover_manifests(&dir.path().join(".project"), &IgnoreConfig::default());
        assert_eq!(found.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "locked/requirements.txt");
        touch(dir.path(), "open/requirements.txt");

        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users read through the mode bits.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let found = discover_manifests(dir.path(), &IgnoreConfig::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(relative(dir.path(), &found), vec!["open/requirements.txt"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover_manifests(dir.path(), &IgnoreConfig::default()).is_empty());
    }
}
