//! Test infrastructure for pullio integration tests.
#![allow(dead_code)]

use anyhow::Result;
use pullio::config::Config;
use pullio::git::run_git;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Returns a config suitable for tests (normal verbosity, defaults otherwise).
pub fn test_config() -> Config {
    Config::default()
}

pub fn fallbacks(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Initializes a repository with one commit on `branch`.
pub fn init_repo(path: &Path, branch: &str) -> Result<()> {
    run_git(path, &["init", "-b", branch])?;
    configure_identity(path)?;
    std::fs::write(path.join("README.md"), "# Test Repo\n")?;
    run_git(path, &["add", "README.md"])?;
    run_git(path, &["commit", "-m", "Initial commit"])?;
    Ok(())
}

fn configure_identity(path: &Path) -> Result<()> {
    run_git(path, &["config", "user.email", "test@example.com"])?;
    run_git(path, &["config", "user.name", "Test User"])?;
    run_git(path, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// Creates a bare repository whose HEAD names `branch`.
pub fn init_bare(path: &Path, branch: &str) -> Result<()> {
    run_git(path, &["init", "--bare", "-b", branch])?;
    Ok(())
}

/// A temporary git repository for testing.
/// Automatically cleaned up when dropped, together with its remote.
pub struct TestRepo {
    _temp_dir: TempDir,
    path: PathBuf,
    remote: Option<TempDir>,
}

impl TestRepo {
    /// Creates a repository with an initial commit on `branch` and no remote.
    pub fn new(branch: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("repo");
        std::fs::create_dir_all(&path)?;
        init_repo(&path, branch)?;

        Ok(Self {
            _temp_dir: temp_dir,
            path,
            remote: None,
        })
    }

    /// Creates a repository pushed to a bare `origin` whose HEAD is `branch`.
    pub fn with_remote(branch: &str) -> Result<Self> {
        let mut repo = Self::new(branch)?;
        let remote = TempDir::new()?;
        init_bare(remote.path(), branch)?;

        repo.git(&["remote", "add", "origin", &path_str(remote.path())])?;
        repo.git(&["push", "-u", "origin", branch])?;
        repo.remote = Some(remote);
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote_path(&self) -> Option<&Path> {
        self.remote.as_ref().map(|r| r.path())
    }

    pub fn git(&self, args: &[&str]) -> Result<String> {
        run_git(&self.path, args)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn head_commit(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.git(&["branch", name])?;
        Ok(())
    }

    pub fn commit_file(&self, name: &str, content: &str) -> Result<()> {
        std::fs::write(self.path.join(name), content)?;
        self.git(&["add", name])?;
        self.git(&["commit", "-m", &format!("Update {name}")])?;
        Ok(())
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    /// Pushes a new commit to `branch` on the remote from a separate clone.
    pub fn push_upstream_change(&self, branch: &str, file: &str, content: &str) -> Result<()> {
        let remote = self
            .remote_path()
            .ok_or_else(|| anyhow::anyhow!("repository has no remote"))?;
        let scratch = TempDir::new()?;
        let clone = scratch.path().join("clone");
        run_git(
            scratch.path(),
            &["clone", "-b", branch, &path_str(remote), &path_str(&clone)],
        )?;
        configure_identity(&clone)?;
        std::fs::write(clone.join(file), content)?;
        run_git(&clone, &["add", file])?;
        run_git(&clone, &["commit", "-m", &format!("Upstream {file}")])?;
        run_git(&clone, &["push", "origin", branch])?;
        Ok(())
    }

    /// Points `origin` at a path that does not exist.
    pub fn break_remote(&self) -> Result<()> {
        self.git(&["remote", "set-url", "origin", "/nonexistent/pullio-remote"])?;
        Ok(())
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Creates `(name, branch)` repositories under `workspace`, each with its own remote.
/// The returned remotes must be kept alive for the duration of the test.
pub fn setup_workspace_with_repos(
    workspace: &TempDir,
    repos: &[(&str, &str)],
) -> Result<Vec<TempDir>> {
    let mut remotes = Vec::new();
    for (name, branch) in repos {
        let path = workspace.path().join(name);
        std::fs::create_dir_all(&path)?;
        init_repo(&path, branch)?;

        let remote = TempDir::new()?;
        init_bare(remote.path(), branch)?;
        run_git(&path, &["remote", "add", "origin", &path_str(remote.path())])?;
        run_git(&path, &["push", "-u", "origin", branch])?;
        remotes.push(remote);
    }
    Ok(remotes)
}
