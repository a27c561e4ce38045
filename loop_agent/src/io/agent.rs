//! Agent abstraction for coding-agent invocation.
//!
//! The [`Agent`] trait decouples the phase loops from the actual agent
//! executable. Tests use scripted agents that mutate the repository directly
//! without spawning processes.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::types::Phase;
use crate::io::config::AgentConfig;
use crate::io::process::{exit_code, run_streamed};
use crate::io::transcript::Transcript;

/// How the rendered prompt reaches the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    /// `--prompt` with no value; the prompt is written to stdin.
    Stdin(String),
    /// `--prompt <text>`; stdin is closed.
    Arg(String),
}

impl PromptInput {
    pub fn text(&self) -> &str {
        match self {
            PromptInput::Stdin(text) | PromptInput::Arg(text) => text,
        }
    }
}

/// Parameters for one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub phase: Phase,
    /// Working directory for the agent process (the repository root).
    pub workdir: PathBuf,
    pub prompt: PromptInput,
    /// Where the rendered prompt was recorded before this invocation.
    pub prompt_record: PathBuf,
    /// Transcript tag, e.g. `ITER-2-AGENT-SPEC`.
    pub tag: String,
    /// Per-phase transcript record, `<iterdir>/<tag>.txt`.
    pub transcript_path: PathBuf,
}

/// Abstraction over coding-agent backends.
pub trait Agent {
    /// Run the agent to completion. Any failure is fatal to the session.
    fn invoke(&self, request: &AgentRequest, transcript: &Transcript) -> Result<()>;
}

/// Agent that spawns an external executable with a fixed argument vector.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn command(&self, request: &AgentRequest) -> (Command, Option<Vec<u8>>) {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--prompt")
            .current_dir(&request.workdir);
        let stdin = match &request.prompt {
            PromptInput::Stdin(text) => Some(text.as_bytes().to_vec()),
            PromptInput::Arg(text) => {
                cmd.arg(text);
                None
            }
        };
        (cmd, stdin)
    }
}

impl Agent for CommandAgent {
    #[instrument(skip_all, fields(phase = ?request.phase, tag = %request.tag))]
    fn invoke(&self, request: &AgentRequest, transcript: &Transcript) -> Result<()> {
        info!(program = %self.program, "starting agent");
        let (cmd, stdin) = self.command(request);
        let run = run_streamed(
            cmd,
            stdin.as_deref(),
            &request.tag,
            transcript,
            &request.transcript_path,
        )
        .with_context(|| format!("run agent for {}", request.tag))?;

        if !run.status.success() {
            let code = exit_code(run.status);
            warn!(exit_code = code, "agent failed");
            transcript.line(format!("[EXEC] {} error: exit code {code}", run.command));
            return Err(anyhow!(
                "agent `{}` failed with exit code {code}",
                run.command
            ));
        }

        debug!(seconds = run.duration.as_secs_f64(), "agent completed");
        Ok(())
    }
}
