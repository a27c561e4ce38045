//! Session startup.
//!
//! Starting a session creates `.loop_agent/<YYMMDDHHMMSS>/`, opens its log,
//! records the platform, and moves the repository onto a fresh
//! `ai/gen/loop-<timestamp>` branch. Everything the loop does afterwards
//! lands on that branch.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use tracing::{debug, info};

use crate::io::config::LoopConfig;
use crate::io::process::{exit_code, run_streamed};
use crate::io::session::{Session, SessionPaths};
use crate::io::transcript::{Echo, Transcript};
use crate::io::validator::platform_script;

/// Session directory name format, e.g. `250101120000`.
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

/// Start a session in `root`, stamped with the current local time.
pub fn start_session(root: &Path, config: LoopConfig, echo: Echo) -> Result<Session> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    start_session_at(root, config, echo, &timestamp)
}

/// Start a session with an explicit timestamp.
///
/// Fails if `git status` or the branch checkout exits non-zero; the loop
/// never runs off the session branch.
pub fn start_session_at(
    root: &Path,
    config: LoopConfig,
    echo: Echo,
    timestamp: &str,
) -> Result<Session> {
    debug!(root = %root.display(), timestamp, "starting session");
    let paths = SessionPaths::new(root, timestamp);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create session dir {}", paths.dir.display()))?;
    ensure_sessions_gitignore(&paths.gitignore_path)?;

    let transcript = Transcript::open(&paths.log_path, echo)?;
    transcript.line(format!("[LOG] Log in {}", paths.dir.display()));
    let validate_script = platform_script().to_string();
    transcript.line(format!(
        "[OS] Running on: {} using: {validate_script}",
        std::env::consts::OS
    ));

    let session = Session {
        timestamp: timestamp.to_string(),
        paths,
        transcript,
        validate_script,
        config,
    };

    if let Err(err) = checkout_session_branch(&session) {
        session.log(format!("[FATAL] {err:#}"));
        return Err(err);
    }

    info!(branch = %session.branch_name(), dir = %session.paths.dir.display(), "session started");
    Ok(session)
}

fn checkout_session_branch(session: &Session) -> Result<()> {
    let git = session.git();
    run_git_step(session, git.command(&["status"]), "GIT-STATUS")?;
    let branch = session.branch_name();
    run_git_step(
        session,
        git.command(&["checkout", "-b", &branch]),
        "GIT-CHECKOUT",
    )
}

fn run_git_step(session: &Session, cmd: std::process::Command, tag: &str) -> Result<()> {
    let record = session.paths.dir.join(format!("{tag}.txt"));
    let run = run_streamed(cmd, None, tag, &session.transcript, &record)?;
    if !run.status.success() {
        return Err(anyhow!(
            "`{}` failed with exit code {}",
            run.command,
            exit_code(run.status)
        ));
    }
    Ok(())
}

/// Keep every session artifact out of git so logs never dirty the tree.
fn ensure_sessions_gitignore(path: &Path) -> Result<()> {
    const REQUIRED: &str = "*";

    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    } else {
        String::new()
    };
    if existing.lines().map(str::trim).any(|l| l == REQUIRED) {
        return Ok(());
    }

    let mut out = existing;
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(REQUIRED);
    out.push('\n');
    fs::write(path, out).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::git::Git;
    use crate::test_support::TestRepo;

    #[test]
    fn start_creates_session_dir_and_branch() {
        let repo = TestRepo::new().expect("repo");

        let session =
            start_session_at(repo.path(), LoopConfig::default(), Echo::Silent, "250101120000")
                .expect("start");

        assert_eq!(session.branch_name(), "ai/gen/loop-250101120000");
        assert_eq!(
            Git::new(repo.path()).current_branch().expect("branch"),
            "ai/gen/loop-250101120000"
        );
        let log = fs::read_to_string(&session.paths.log_path).expect("log");
        assert!(log.contains("[LOG] Log in"));
        assert!(log.contains("[OS] Running on:"));
        assert!(log.contains("[EXEC] GIT-CHECKOUT exit code: 0"));
        assert!(session.paths.dir.join("GIT-STATUS.txt").exists());
        // Session artifacts are ignored.
        assert!(!Git::new(repo.path()).status().expect("status").dirty);
    }

    #[test]
    fn existing_branch_is_fatal() {
        let repo = TestRepo::new().expect("repo");
        start_session_at(repo.path(), LoopConfig::default(), Echo::Silent, "250101120000")
            .expect("first start");

        let err = start_session_at(repo.path(), LoopConfig::default(), Echo::Silent, "250101120000")
            .expect_err("branch already exists");
        assert!(err.to_string().contains("checkout -b ai/gen/loop-250101120000"));

        let log_path = repo.path().join(".loop_agent/250101120000/log");
        let log = fs::read_to_string(log_path).expect("log");
        let last = log.lines().last().expect("log has lines");
        assert!(last.contains("[FATAL] `git checkout -b ai/gen/loop-250101120000` failed"));
    }

    #[test]
    fn gitignore_is_appended_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".gitignore");
        fs::write(&path, "custom").expect("write");

        ensure_sessions_gitignore(&path).expect("ensure");
        ensure_sessions_gitignore(&path).expect("ensure again");

        assert_eq!(fs::read_to_string(&path).expect("read"), "custom\n*\n");
    }
}
