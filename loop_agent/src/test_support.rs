//! Test-only helpers: throwaway git repositories and scripted agent/validator
//! doubles that stand in for the real subprocesses.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{Phase, ValidateOutcome};
use crate::io::agent::{Agent, AgentRequest, PromptInput};
use crate::io::config::LoopConfig;
use crate::io::git::Git;
use crate::io::session::Session;
use crate::io::transcript::{Echo, Transcript};
use crate::io::validator::Validator;
use crate::start::start_session;

/// Temporary git repository with one initial commit.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let repo = Self { dir };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "loop@example.com"])?;
        repo.git(&["config", "user.name", "Loop Test"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.write("README.md", "# test repo\n")?;
        repo.commit_all("chore: initial commit")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to a repository-relative path, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        commit_all(self.path(), message)
    }

    /// Start a silent session with default config.
    pub fn start_session(&self) -> Result<Session> {
        start_session(self.path(), LoopConfig::default(), Echo::Silent)
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let status = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .status()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !status.success() {
            return Err(anyhow!("git {} failed", args.join(" ")));
        }
        Ok(())
    }
}

/// Stage and commit everything under `root`; a clean tree is left alone.
pub fn commit_all(root: &Path, message: &str) -> Result<()> {
    let git = Git::new(root);
    git.add_all()?;
    git.commit_staged(message)?;
    Ok(())
}

/// One invocation seen by a [`ScriptedAgent`].
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub phase: Phase,
    pub tag: String,
    pub prompt: PromptInput,
    pub prompt_record: std::path::PathBuf,
}

type Handler = Box<dyn FnMut(&AgentRequest) -> Result<()>>;

/// Agent double: records each request, writes a transcript, then hands the
/// request to a closure that mutates the repository as a real agent would.
pub struct ScriptedAgent {
    handler: RefCell<Handler>,
    calls: RefCell<Vec<AgentCall>>,
}

impl ScriptedAgent {
    pub fn new(handler: impl FnMut(&AgentRequest) -> Result<()> + 'static) -> Self {
        Self {
            handler: RefCell::new(Box::new(handler)),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.calls.borrow().iter().filter(|c| c.phase == phase).count()
    }
}

impl Agent for ScriptedAgent {
    fn invoke(&self, request: &AgentRequest, transcript: &Transcript) -> Result<()> {
        let _scope = transcript.scope(&request.transcript_path)?;
        transcript.line(format!("[EXEC] command: scripted-agent {}", request.tag));
        self.calls.borrow_mut().push(AgentCall {
            phase: request.phase,
            tag: request.tag.clone(),
            prompt: request.prompt.clone(),
            prompt_record: request.prompt_record.clone(),
        });
        (self.handler.borrow_mut())(request)
    }
}

/// Validator double returning queued outcomes in order.
pub struct ScriptedValidator {
    queue: RefCell<VecDeque<ValidateOutcome>>,
}

impl ScriptedValidator {
    /// Queue bare exit codes.
    pub fn new(codes: Vec<i32>) -> Self {
        Self::from_outcomes(
            codes
                .into_iter()
                .map(|exit_code| ValidateOutcome {
                    exit_code,
                    output: format!("scripted exit {exit_code}"),
                    timed_out: false,
                })
                .collect(),
        )
    }

    pub fn from_outcomes(outcomes: Vec<ValidateOutcome>) -> Self {
        Self {
            queue: RefCell::new(outcomes.into()),
        }
    }

    /// Panics if queued outcomes were never consumed.
    pub fn assert_drained(&self) {
        let left = self.queue.borrow().len();
        assert_eq!(left, 0, "{left} scripted validator outcome(s) unused");
    }
}

impl Validator for ScriptedValidator {
    fn validate(&self) -> ValidateOutcome {
        self.queue
            .borrow_mut()
            .pop_front()
            .expect("scripted validator exhausted")
    }
}
