//! Git adapter for the iteration controller.
//!
//! The controller never commits on its own; it only asks git whether the tree
//! is dirty and creates the session branch. Commit helpers exist for the
//! scripted agents used in tests.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Result of the repository probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub dirty: bool,
    /// Raw `git status --porcelain=v1` output, fed verbatim to the cleanup prompt.
    pub changes: String,
}

impl RepoStatus {
    fn from_porcelain(changes: String) -> Self {
        Self {
            dirty: !changes.is_empty(),
            changes,
        }
    }
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Probe the working tree. Empty porcelain output means clean.
    ///
    /// Errors if git itself fails: the loop cannot reason about cleanliness
    /// without it.
    #[instrument(skip_all)]
    pub fn status(&self) -> Result<RepoStatus> {
        let out = self.run_capture(&["status", "--porcelain=v1"])?;
        let status = RepoStatus::from_porcelain(out);
        if status.dirty {
            warn!(
                changed = status.changes.lines().count(),
                "worktree not clean"
            );
        } else {
            debug!("worktree is clean");
        }
        Ok(status)
    }

    /// Build a git command rooted at the working directory, for streamed runs.
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        cmd
    }

    /// Return the current branch name (errors on detached HEAD).
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            return Err(anyhow!("detached HEAD"));
        }
        Ok(name)
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!("committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;
    use std::fs;

    #[test]
    fn status_reports_clean_then_dirty() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());

        let clean = git.status().expect("status");
        assert!(!clean.dirty);
        assert!(clean.changes.is_empty());

        fs::write(repo.path().join("notes.txt"), "x").expect("write");
        let dirty = git.status().expect("status");
        assert!(dirty.dirty);
        assert_eq!(dirty.changes, "?? notes.txt\n");
    }

    #[test]
    fn status_fails_outside_a_repository() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = Git::new(temp.path()).status().expect_err("probe should fail");
        assert!(err.to_string().contains("git status --porcelain=v1 failed"));
    }
}
