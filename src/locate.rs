//! Repository discovery.

use crate::constants::{GIT_DIR, SKIPPED_DIRS};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

fn git_dir_of(path: &Path) -> Option<PathBuf> {
    let git_dir = path.join(GIT_DIR);
    git_dir.is_dir().then_some(git_dir)
}

fn is_skipped(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Finds the `.git` directory of every repository under `start`.
///
/// If `start` is itself a repository it is returned alone and nothing
/// below it is scanned. Otherwise the tree is walked in name order without
/// following symlinks, and the walk never descends into a repository it has
/// already matched.
pub fn find_repository_roots(start: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let root = start
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", start.display()))?;
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    if let Some(git_dir) = git_dir_of(&root) {
        debug!(root = %root.display(), "start path is a repository");
        return Ok(vec![git_dir]);
    }

    let mut found = Vec::new();
    let mut entries = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_skipped) {
            entries.skip_current_dir();
            continue;
        }
        if let Some(git_dir) = git_dir_of(entry.path()) {
            debug!(repo = %entry.path().display(), "found repository");
            found.push(git_dir);
            entries.skip_current_dir();
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_skipped() {
        assert!(is_skipped(".git"));
        assert!(is_skipped(".cache"));
        assert!(is_skipped("node_modules"));
        assert!(is_skipped("target"));
        assert!(!is_skipped("src"));
        assert!(!is_skipped("my.project"));
    }
}
