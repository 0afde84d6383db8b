//! Default branch detection.
//!
//! Strategies run in a fixed trust order: the remote's recorded HEAD
//! pointer, then the HEAD branch the remote advertises, then the caller's
//! fallback names. The first one that yields a branch wins.

use crate::constants::ORIGIN_REMOTE;
use crate::git::Vcs;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Which strategy produced a [`DetectedBranch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSource {
    SymbolicRef,
    RemoteHead,
    Fallback,
}

impl fmt::Display for BranchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchSource::SymbolicRef => "symbolic-ref",
            BranchSource::RemoteHead => "remote show",
            BranchSource::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBranch {
    pub name: String,
    pub source: BranchSource,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchError {
    #[error("could not detect default branch (none of [{}] exists locally)", .fallbacks.join(", "))]
    NoBranchFound { fallbacks: Vec<String> },
}

/// Determines the branch that should be checked out and pulled.
pub fn detect_default_branch<V: Vcs + ?Sized>(
    vcs: &V,
    repo: &Path,
    fallbacks: &[String],
) -> Result<DetectedBranch, BranchError> {
    match vcs.symbolic_head(repo, ORIGIN_REMOTE) {
        Ok(name) => {
            debug!(repo = %repo.display(), branch = %name, "default branch via symbolic-ref");
            return Ok(DetectedBranch {
                name,
                source: BranchSource::SymbolicRef,
            });
        }
        Err(e) => debug!(repo = %repo.display(), "symbolic-ref unavailable: {e:#}"),
    }

    match vcs.remote_description(repo, ORIGIN_REMOTE) {
        Ok(description) => {
            if let Some(name) = parse_head_branch(&description) {
                debug!(repo = %repo.display(), branch = %name, "default branch via remote show");
                return Ok(DetectedBranch {
                    name: name.to_string(),
                    source: BranchSource::RemoteHead,
                });
            }
            debug!(repo = %repo.display(), "remote show did not name a HEAD branch");
        }
        Err(e) => debug!(repo = %repo.display(), "remote show failed: {e:#}"),
    }

    for candidate in fallbacks {
        if vcs.branch_exists(repo, candidate) {
            debug!(repo = %repo.display(), branch = %candidate, "default branch via fallback");
            return Ok(DetectedBranch {
                name: candidate.clone(),
                source: BranchSource::Fallback,
            });
        }
    }

    Err(BranchError::NoBranchFound {
        fallbacks: fallbacks.to_vec(),
    })
}

/// Extracts the branch from the `HEAD branch:` line of `git remote show`.
///
/// Returns `None` when the line is missing or git reports a placeholder
/// such as `(unknown)`.
pub fn parse_head_branch(description: &str) -> Option<&str> {
    description
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("HEAD branch:"))
        .filter_map(|rest| rest.split_whitespace().last())
        .find(|name| !name.starts_with('('))
}
