//! Phase loops of one iteration.
//!
//! Each phase owns its termination predicate; the agent and validator are
//! reached only through [`PhaseContext`], which keeps the prompt-record and
//! transcript conventions in one place.

pub mod archive;
pub mod cleanup;
pub mod evolve;
pub mod green;
pub mod red;
pub mod select;
pub mod specify;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::core::types::{Phase, ValidateOutcome};
use crate::io::agent::{Agent, AgentRequest, PromptInput};
use crate::io::iteration_log::IterationPaths;
use crate::io::prompt::write_prompt_record;
use crate::io::session::Session;
use crate::io::validator::Validator;

/// Mutable state of the iteration in progress.
#[derive(Debug, Clone)]
pub struct IterationState {
    pub number: u32,
    pub paths: IterationPaths,
    /// Monotonic cleanup counter; starts at 1 and only grows within the iteration.
    pub cleanup_attempt: u32,
}

/// Everything a phase needs: the session, the agent and validator seams, and
/// the iteration state.
pub struct PhaseContext<'a, A: Agent, V: Validator> {
    pub session: &'a Session,
    pub agent: &'a A,
    pub validator: &'a V,
    pub iteration: IterationState,
}

impl<'a, A: Agent, V: Validator> PhaseContext<'a, A, V> {
    /// Create the iteration directory and reset the cleanup counter.
    pub fn begin(
        session: &'a Session,
        agent: &'a A,
        validator: &'a V,
        number: u32,
    ) -> Result<Self> {
        let paths = IterationPaths::new(session.paths.iteration_dir(number));
        paths.create()?;
        debug!(iteration = number, dir = %paths.dir.display(), "iteration directory ready");
        Ok(Self {
            session,
            agent,
            validator,
            iteration: IterationState {
                number,
                paths,
                cleanup_attempt: 1,
            },
        })
    }

    pub fn number(&self) -> u32 {
        self.iteration.number
    }

    pub fn paths(&self) -> &IterationPaths {
        &self.iteration.paths
    }

    pub fn root(&self) -> &Path {
        self.session.root()
    }

    pub fn log(&self, line: impl AsRef<str>) {
        self.session.log(line);
    }

    /// Record the prompt, then run the agent once.
    ///
    /// The record is on disk before the agent starts, so a crash mid-phase
    /// still leaves the prompt behind. Agent failure is fatal.
    pub fn invoke_agent(
        &self,
        phase: Phase,
        tag: String,
        prompt: PromptInput,
        record: PathBuf,
    ) -> Result<()> {
        write_prompt_record(&record, prompt.text())?;
        let request = AgentRequest {
            phase,
            workdir: self.root().to_path_buf(),
            prompt,
            prompt_record: record,
            transcript_path: self.iteration.paths.transcript(&tag),
            tag,
        };
        self.agent.invoke(&request, &self.session.transcript)
    }

    /// Run the validator once inside a `VALIDATE` timing span.
    pub fn validate(&self) -> ValidateOutcome {
        let outcome = {
            let _span = self.session.transcript.span("VALIDATE");
            self.validator.validate()
        };
        self.log(format!(
            "[VALIDATE] {} exit code: {}",
            self.session.validate_script, outcome.exit_code
        ));
        outcome
    }
}
