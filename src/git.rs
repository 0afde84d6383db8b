//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands,
//! handling command execution, timeouts and error formatting. The
//! [`Vcs`] trait is the narrow surface the resolver and updater use, so
//! they never see raw command lines.

use crate::agent::AgentContext;
use crate::constants::{self, CHILD_POLL_INTERVAL};
use anyhow::Context;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// How `git pull` reconciles local and remote history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    /// Refuse anything but a fast-forward.
    FastForwardOnly,
    /// Create a merge commit when histories diverged.
    Merge,
}

impl PullMode {
    fn args(self) -> &'static [&'static str] {
        match self {
            PullMode::FastForwardOnly => &["pull", "--ff-only", "-q"],
            PullMode::Merge => &["pull", "--no-rebase", "--no-edit", "-q"],
        }
    }
}

/// Version-control queries and mutations needed to update one repository.
pub trait Vcs: Sync {
    /// True when `path` is inside a work tree.
    fn is_repository(&self, path: &Path) -> bool;

    /// True when a remote called `remote` is configured.
    fn has_remote(&self, path: &Path, remote: &str) -> bool;

    /// Branch recorded in `refs/remotes/<remote>/HEAD`.
    fn symbolic_head(&self, path: &Path, remote: &str) -> anyhow::Result<String>;

    /// Descriptive output of `git remote show <remote>`.
    fn remote_description(&self, path: &Path, remote: &str) -> anyhow::Result<String>;

    /// True when `refs/heads/<branch>` exists locally.
    fn branch_exists(&self, path: &Path, branch: &str) -> bool;

    fn checkout(&self, path: &Path, branch: &str) -> anyhow::Result<()>;

    fn pull(&self, path: &Path, mode: PullMode) -> anyhow::Result<()>;
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
    agent: Option<AgentContext>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(constants::git_timeout())
    }
}

impl GitCli {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            agent: None,
        }
    }

    /// Routes every git child process through the given credential agent.
    #[must_use]
    pub fn with_agent(mut self, agent: AgentContext) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Runs `git <args>` in `repo` and returns trimmed stdout.
    pub fn run(&self, repo: &Path, args: &[&str]) -> anyhow::Result<String> {
        debug!(repo = %repo.display(), "git {}", args.join(" "));

        let mut command = Command::new("git");
        command
            .current_dir(repo)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(agent) = &self.agent {
            agent.apply(&mut command);
        }

        let mut child = command.spawn().context("Failed to spawn git command")?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_handle = thread::spawn(move || read_pipe(stdout));
        let err_handle = thread::spawn(move || read_pipe(stderr));

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child
                .try_wait()
                .context("Failed to wait for git command")?
            {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                // Readers are left detached: a surviving ssh grandchild can
                // hold the pipes open long after git itself is gone.
                anyhow::bail!(
                    "git {} timed out after {}s",
                    args.join(" "),
                    self.timeout.as_secs()
                );
            }
            thread::sleep(CHILD_POLL_INTERVAL);
        };

        let stdout = out_handle.join().unwrap_or_default();
        let stderr = err_handle.join().unwrap_or_default();

        if status.success() {
            Ok(String::from_utf8_lossy(&stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&stderr);
            let stdout = String::from_utf8_lossy(&stdout);
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            anyhow::bail!("git {} failed: {}", args.join(" "), detail)
        }
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Runs a git command with the default timeout and no agent context.
pub fn run_git(repo: &Path, args: &[&str]) -> anyhow::Result<String> {
    GitCli::default().run(repo, args)
}

fn validate_branch_name(branch: &str) -> anyhow::Result<()> {
    if branch.is_empty() || branch.contains('\0') || branch.contains('\n') || branch.starts_with('-')
    {
        anyhow::bail!("Invalid branch name: {:?}", branch);
    }
    Ok(())
}

impl Vcs for GitCli {
    fn is_repository(&self, path: &Path) -> bool {
        self.run(path, &["rev-parse", "--is-inside-work-tree"])
            .is_ok_and(|out| out == "true")
    }

    fn has_remote(&self, path: &Path, remote: &str) -> bool {
        self.run(path, &["remote", "get-url", remote]).is_ok()
    }

    fn symbolic_head(&self, path: &Path, remote: &str) -> anyhow::Result<String> {
        let reference = format!("refs/remotes/{remote}/HEAD");
        let target = self
            .run(path, &["symbolic-ref", "--quiet", &reference])
            .with_context(|| format!("{reference} is not set"))?;

        let prefix = format!("refs/remotes/{remote}/");
        match target.strip_prefix(&prefix) {
            Some(branch) if !branch.is_empty() => Ok(branch.to_string()),
            _ => anyhow::bail!("{reference} points outside {prefix}: {target}"),
        }
    }

    fn remote_description(&self, path: &Path, remote: &str) -> anyhow::Result<String> {
        self.run(path, &["remote", "show", remote])
            .with_context(|| format!("Failed to describe remote '{remote}'"))
    }

    fn branch_exists(&self, path: &Path, branch: &str) -> bool {
        if validate_branch_name(branch).is_err() {
            return false;
        }
        let reference = format!("refs/heads/{branch}");
        self.run(path, &["show-ref", "--verify", "--quiet", &reference])
            .is_ok()
    }

    fn checkout(&self, path: &Path, branch: &str) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run(path, &["checkout", "-q", branch])?;
        Ok(())
    }

    fn pull(&self, path: &Path, mode: PullMode) -> anyhow::Result<()> {
        self.run(path, mode.args())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_branch_name_rejects_unsafe_names() {
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("release/1.0").is_ok());
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("-delete").is_err());
        assert!(validate_branch_name("a\nb").is_err());
        assert!(validate_branch_name("a\0b").is_err());
    }

    #[test]
    fn test_pull_mode_args() {
        assert_eq!(
            PullMode::FastForwardOnly.args(),
            &["pull", "--ff-only", "-q"]
        );
        assert!(PullMode::Merge.args().contains(&"--no-rebase"));
    }
}
