//! CLEANUP: drive the working tree back to clean.
//!
//! Runs at every phase boundary. The agent is told exactly which paths are
//! dirty and asked to commit, restore, or ignore them; the probe is repeated
//! until git reports nothing.

use anyhow::Result;
use tracing::warn;

use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::prompt::cleanup_prompt;
use crate::io::validator::Validator;
use crate::phases::PhaseContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Tree was already clean; nothing ran and nothing was written.
    AlreadyClean,
    Cleaned { invocations: u32 },
}

/// Return once `git status --porcelain` is empty.
///
/// There is no upper bound; past `cleanup_warn_after` attempts every retry
/// logs a warning.
pub fn run_cleanup<A: Agent, V: Validator>(
    ctx: &mut PhaseContext<'_, A, V>,
) -> Result<CleanupOutcome> {
    let git = ctx.session.git();
    let mut status = git.status()?;
    if !status.dirty {
        return Ok(CleanupOutcome::AlreadyClean);
    }

    let iteration = ctx.number();
    let tag = Phase::Cleanup.tag(iteration, Some(ctx.iteration.cleanup_attempt));
    ctx.log(format!("[{tag}] Repo is dirty, clean up"));

    let warn_after = ctx.session.config.cleanup_warn_after;
    let mut invocations = 0;
    while status.dirty {
        let attempt = ctx.iteration.cleanup_attempt;
        if attempt > warn_after {
            ctx.log(format!(
                "[CLEANUP] WARNING: cleanup attempt {attempt} in iteration {iteration} exceeds {warn_after}, the tree keeps coming back dirty"
            ));
            warn!(iteration, attempt, warn_after, "cleanup is not converging");
        }

        let prompt = cleanup_prompt(&status.changes, iteration, attempt);
        let record = ctx.paths().cleanup_prompt(attempt);
        ctx.invoke_agent(Phase::Cleanup, tag.clone(), PromptInput::Stdin(prompt), record)?;
        ctx.iteration.cleanup_attempt += 1;
        invocations += 1;

        status = git.status()?;
    }

    Ok(CleanupOutcome::Cleaned { invocations })
}
