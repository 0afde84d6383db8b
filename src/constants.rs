//! Application-wide constants.
//!
//! Centralized configuration values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Default timeout for individual git operations (in seconds).
/// Pulls go over the network, so this is more generous than a local command needs.
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Environment variable overriding the default git timeout.
pub const GIT_TIMEOUT_ENV: &str = "PULLIO_GIT_TIMEOUT";

/// Returns the default git command timeout.
///
/// Can be customized via the PULLIO_GIT_TIMEOUT environment variable (in seconds).
/// Falls back to 120 seconds if not set or invalid.
///
/// Example: `PULLIO_GIT_TIMEOUT=300 pullio`
pub fn git_timeout() -> Duration {
    std::env::var(GIT_TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Number of repositories updated at the same time unless overridden.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Branch names tried, in order, when the remote does not say which branch is primary.
pub const DEFAULT_FALLBACK_BRANCHES: &[&str] = &["main", "master"];

/// Private key registered with the agent unless overridden.
pub const DEFAULT_KEY_PATH: &str = "~/.ssh/id_ed25519";

/// Remote every repository must have to be updated.
pub const ORIGIN_REMOTE: &str = "origin";

/// Git directory name used to detect repositories.
pub const GIT_DIR: &str = ".git";

/// Directory names never descended into while looking for repositories.
/// Dot-directories are skipped separately.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", "dist", "build", "target"];

/// Environment variable naming the agent socket.
pub const AGENT_SOCK_ENV: &str = "SSH_AUTH_SOCK";

/// Environment variable carrying the agent pid.
pub const AGENT_PID_ENV: &str = "SSH_AGENT_PID";

/// How long to wait after launching an agent before trusting its socket.
pub const AGENT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Poll interval while waiting on a git child process.
pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Progress bar tick interval in milliseconds.
/// Controls how often the spinner/bar animates.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Maximum number of completed repositories to show in the progress display.
pub const MAX_VISIBLE_COMPLETIONS: usize = 5;

/// Default name used when a repository name cannot be determined from its path.
pub const DEFAULT_REPO_NAME: &str = "repository";
