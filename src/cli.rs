//! Command-line arguments.

use crate::config::{Config, Verbosity};
use crate::constants::{self, DEFAULT_CONCURRENCY, DEFAULT_KEY_PATH};
use crate::repo::SyncPolicy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "pullio",
    version,
    about = "Updates all Git repositories under the specified path",
    long_about = None,
)]
pub struct Args {
    /// Starting path to search for repositories
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Path to the SSH private key
    #[arg(short, long, default_value = DEFAULT_KEY_PATH)]
    pub key: PathBuf,

    /// Comma-separated list of default branch names to try
    #[arg(short, long, value_delimiter = ',', default_value = "main,master")]
    pub branches: Vec<String>,

    /// Number of repositories to process concurrently
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrent: usize,

    /// How to bring the default branch up to date
    #[arg(long, value_enum, default_value_t = SyncPolicy::FastForwardOnly)]
    pub sync_policy: SyncPolicy,

    /// Per-command git timeout in seconds [default: $PULLIO_GIT_TIMEOUT or 120]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print the final count and failures
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_concurrency(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    #[must_use]
    pub fn into_config(self) -> Config {
        let verbosity = if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };

        Config {
            verbosity,
            start_path: self.path,
            key_path: self.key,
            fallback_branches: self
                .branches
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect(),
            concurrency: self.concurrent,
            sync_policy: self.sync_policy,
            git_timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or_else(constants::git_timeout),
        }
    }
}
