//! Configuration types for CLI verbosity and options.

use crate::constants::{self, DEFAULT_CONCURRENCY, DEFAULT_FALLBACK_BRANCHES, DEFAULT_KEY_PATH};
use crate::repo::SyncPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration derived from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Directory searched for repositories.
    pub start_path: PathBuf,
    /// Private key the credential agent must hold. May start with `~`.
    pub key_path: PathBuf,
    /// Ordered last-resort branch names for default branch detection.
    pub fallback_branches: Vec<String>,
    /// Maximum number of repositories updated at once.
    pub concurrency: usize,
    /// How a checked-out branch is brought up to date with its remote.
    pub sync_policy: SyncPolicy,
    /// Upper bound on any single git invocation.
    pub git_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            start_path: PathBuf::from("."),
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            fallback_branches: DEFAULT_FALLBACK_BRANCHES
                .iter()
                .map(|b| b.to_string())
                .collect(),
            concurrency: DEFAULT_CONCURRENCY,
            sync_policy: SyncPolicy::default(),
            git_timeout: constants::git_timeout(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the default tracing filter directive for this verbosity.
    ///
    /// Diagnostics are only shown in verbose mode; otherwise the progress bar
    /// and summary are the whole output. `RUST_LOG` overrides this.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.is_verbose() { "debug" } else { "off" }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}
