// Repository update sequence, task and outcome types

use crate::branch;
use crate::constants::{DEFAULT_REPO_NAME, GIT_DIR, ORIGIN_REMOTE};
use crate::git::{PullMode, Vcs};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, warn};

/// One repository working tree to update.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryTask {
    path: PathBuf,
}

impl RepositoryTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Builds a task from a `.git` directory found by the locator.
    pub fn from_git_dir(git_dir: &Path) -> Self {
        let path = match git_dir.file_name() {
            Some(name) if name == GIT_DIR => git_dir.parent().unwrap_or(git_dir),
            _ => git_dir,
        };
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path component, used for compact progress display.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_REPO_NAME)
    }
}

/// Result of updating one repository. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOutcome {
    path: PathBuf,
    branch: String,
    success: bool,
    reason: String,
}

impl RepositoryOutcome {
    pub fn success(path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            success: true,
            reason: String::new(),
        }
    }

    /// `branch` is empty when the failure happened before resolution.
    pub fn failure(
        path: impl Into<PathBuf>,
        branch: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            success: false,
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// How the resolved branch is synchronized with its remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SyncPolicy {
    /// Only fast-forward; diverged history is reported as a failure.
    #[default]
    #[value(name = "ff-only")]
    FastForwardOnly,
    /// Plain pull, creating a merge commit when needed.
    #[value(name = "merge")]
    Merge,
    /// Try a fast-forward and fall back to a merge if it is refused.
    #[value(name = "ff-or-merge")]
    FastForwardOrMerge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStep {
    CheckingDirectory,
    ValidatingRepository,
    CheckingRemote,
    DetectingBranch,
    CheckingOut { branch: String },
    Pulling { branch: String },
    Completed,
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStep::CheckingDirectory => write!(f, "Checking directory"),
            UpdateStep::ValidatingRepository => write!(f, "Validating repository"),
            UpdateStep::CheckingRemote => write!(f, "Checking origin remote"),
            UpdateStep::DetectingBranch => write!(f, "Detecting default branch"),
            UpdateStep::CheckingOut { branch } => write!(f, "Checking out {branch}"),
            UpdateStep::Pulling { branch } => write!(f, "Pulling {branch}"),
            UpdateStep::Completed => write!(f, "Completed"),
        }
    }
}

/// Observer for repository updates. Shared by every worker, so it must be `Sync`.
pub trait UpdateCallbacks: Sync {
    /// The task left the queue and is now running.
    fn on_update_start(&self, _task: &RepositoryTask) {}

    fn on_step(&self, _task: &RepositoryTask, _step: &UpdateStep) {}

    /// The task finished, successfully or not.
    fn on_complete(&self, _outcome: &RepositoryOutcome) {}
}

/// Inputs shared read-only by every repository update in a run.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions<'a> {
    pub fallback_branches: &'a [String],
    pub sync_policy: SyncPolicy,
}

struct UpdateFailure {
    branch: String,
    reason: String,
    warning: bool,
}

impl UpdateFailure {
    fn error(branch: &str, reason: String) -> Self {
        Self {
            branch: branch.to_string(),
            reason,
            warning: false,
        }
    }

    fn warning(reason: &str) -> Self {
        Self {
            branch: String::new(),
            reason: reason.to_string(),
            warning: true,
        }
    }
}

/// Checks out the default branch of one repository and pulls it.
///
/// Never fails: every problem is recorded in the returned outcome so one
/// repository cannot abort the rest of the batch.
pub fn process_repository<V, C>(
    vcs: &V,
    task: &RepositoryTask,
    options: &UpdateOptions<'_>,
    callbacks: &C,
) -> RepositoryOutcome
where
    V: Vcs + ?Sized,
    C: UpdateCallbacks + ?Sized,
{
    let path = task.path();
    let on_step = |step: UpdateStep| callbacks.on_step(task, &step);

    match do_update(vcs, path, options, &on_step) {
        Ok(branch) => {
            on_step(UpdateStep::Completed);
            RepositoryOutcome::success(path, branch)
        }
        Err(failure) => {
            if failure.warning {
                warn!(repo = %path.display(), "{}", failure.reason);
            } else {
                error!(repo = %path.display(), "{}", failure.reason);
            }
            RepositoryOutcome::failure(path, failure.branch, failure.reason)
        }
    }
}

fn do_update<V, F>(
    vcs: &V,
    path: &Path,
    options: &UpdateOptions<'_>,
    on_step: &F,
) -> Result<String, UpdateFailure>
where
    V: Vcs + ?Sized,
    F: Fn(UpdateStep),
{
    on_step(UpdateStep::CheckingDirectory);
    if !path.is_dir() {
        return Err(UpdateFailure::error(
            "",
            "Directory does not exist".to_string(),
        ));
    }

    on_step(UpdateStep::ValidatingRepository);
    if !vcs.is_repository(path) {
        return Err(UpdateFailure::warning("Not a Git repository"));
    }

    on_step(UpdateStep::CheckingRemote);
    if !vcs.has_remote(path, ORIGIN_REMOTE) {
        return Err(UpdateFailure::warning("No origin remote"));
    }

    on_step(UpdateStep::DetectingBranch);
    let branch = branch::detect_default_branch(vcs, path, options.fallback_branches)
        .map_err(|e| {
            UpdateFailure::error("", format!("Failed to detect default branch: {e}"))
        })?
        .name;

    on_step(UpdateStep::CheckingOut {
        branch: branch.clone(),
    });
    let started = Instant::now();
    vcs.checkout(path, &branch).map_err(|e| {
        UpdateFailure::error(
            &branch,
            format!("Failed to checkout branch {branch}: {e:#}"),
        )
    })?;
    debug!(repo = %path.display(), "checked out {branch} in {:?}", started.elapsed());

    on_step(UpdateStep::Pulling {
        branch: branch.clone(),
    });
    let started = Instant::now();
    synchronize(vcs, path, options.sync_policy)
        .map_err(|e| UpdateFailure::error(&branch, format!("Failed to pull: {e:#}")))?;
    debug!(repo = %path.display(), "pulled {branch} in {:?}", started.elapsed());

    Ok(branch)
}

fn synchronize<V: Vcs + ?Sized>(vcs: &V, path: &Path, policy: SyncPolicy) -> anyhow::Result<()> {
    match policy {
        SyncPolicy::FastForwardOnly => vcs.pull(path, PullMode::FastForwardOnly),
        SyncPolicy::Merge => vcs.pull(path, PullMode::Merge),
        SyncPolicy::FastForwardOrMerge => {
            vcs.pull(path, PullMode::FastForwardOnly).or_else(|e| {
                warn!(repo = %path.display(), "fast-forward refused, merging instead: {e:#}");
                vcs.pull(path, PullMode::Merge)
            })
        }
    }
}
