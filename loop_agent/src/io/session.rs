//! Session layout and the owned session context.
//!
//! A session is one run of the controller. Its state is threaded explicitly
//! into every phase; there are no global accessors.

use std::path::{Path, PathBuf};

use crate::io::config::LoopConfig;
use crate::io::git::Git;
use crate::io::transcript::Transcript;

/// Directory (under the repository root) holding all sessions.
pub const SESSIONS_DIR: &str = ".loop_agent";
/// Pending-tasks directory; only regular files inside it are tasks.
pub const TASKS_DIR: &str = "tasks";
/// Transient specification artifact at the repository root.
pub const SPEC_FILE: &str = "SPEC.md";

/// All canonical paths of one session.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub root: PathBuf,
    /// `.loop_agent/.gitignore`
    pub gitignore_path: PathBuf,
    /// `.loop_agent/<YYMMDDHHMMSS>/`
    pub dir: PathBuf,
    /// `.loop_agent/<YYMMDDHHMMSS>/log`
    pub log_path: PathBuf,
    pub tasks_dir: PathBuf,
    pub spec_path: PathBuf,
}

impl SessionPaths {
    pub fn new(root: impl Into<PathBuf>, timestamp: &str) -> Self {
        let root = root.into();
        let sessions_dir = root.join(SESSIONS_DIR);
        let dir = sessions_dir.join(timestamp);
        Self {
            root: root.clone(),
            gitignore_path: sessions_dir.join(".gitignore"),
            log_path: dir.join("log"),
            dir,
            tasks_dir: root.join(TASKS_DIR),
            spec_path: root.join(SPEC_FILE),
        }
    }

    /// `.loop_agent/<YYMMDDHHMMSS>/iter-<n>/`
    pub fn iteration_dir(&self, iteration: u32) -> PathBuf {
        self.dir.join(format!("iter-{iteration}"))
    }
}

/// Owned context of one controller run.
#[derive(Debug)]
pub struct Session {
    /// Startup timestamp, `YYMMDDHHMMSS`.
    pub timestamp: String,
    pub paths: SessionPaths,
    /// Base transcript sink: stdout plus the session log.
    pub transcript: Transcript,
    /// Platform validation script, e.g. `./validate.sh`.
    pub validate_script: String,
    pub config: LoopConfig,
}

impl Session {
    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn git(&self) -> Git {
        Git::new(&self.paths.root)
    }

    /// Session branch, `ai/gen/loop-<timestamp>`.
    pub fn branch_name(&self) -> String {
        branch_name(&self.timestamp)
    }

    pub fn log(&self, line: impl AsRef<str>) {
        self.transcript.line(line);
    }
}

pub fn branch_name(timestamp: &str) -> String {
    format!("ai/gen/loop-{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_paths_are_stable() {
        let paths = SessionPaths::new("/repo", "250101120000");

        assert_eq!(paths.dir, Path::new("/repo/.loop_agent/250101120000"));
        assert_eq!(paths.log_path, Path::new("/repo/.loop_agent/250101120000/log"));
        assert_eq!(paths.gitignore_path, Path::new("/repo/.loop_agent/.gitignore"));
        assert_eq!(paths.tasks_dir, Path::new("/repo/tasks"));
        assert_eq!(paths.spec_path, Path::new("/repo/SPEC.md"));
        assert_eq!(
            paths.iteration_dir(7),
            Path::new("/repo/.loop_agent/250101120000/iter-7")
        );
    }

    #[test]
    fn branch_is_keyed_by_timestamp() {
        assert_eq!(branch_name("250101120000"), "ai/gen/loop-250101120000");
    }
}
