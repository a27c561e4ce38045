//! GREEN: feed validator failures back to the agent until it passes.

use anyhow::Result;

use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::prompt::green_prompt;
use crate::io::validator::Validator;
use crate::phases::PhaseContext;

/// Validate first; on failure prompt the agent with the exit code and output.
///
/// Returns the number of agent rounds (zero if the validator already passed).
pub fn run_green<A: Agent, V: Validator>(ctx: &mut PhaseContext<'_, A, V>) -> Result<u32> {
    let mut rounds = 0;
    loop {
        let outcome = ctx.validate();
        if outcome.passed() {
            ctx.log("[GREEN] Validate succeeded");
            return Ok(rounds);
        }
        ctx.log("[GREEN] Validate failed");

        rounds += 1;
        let prompt = green_prompt(&ctx.session.validate_script, &outcome);
        let record = ctx.paths().green_prompt(rounds);
        ctx.invoke_agent(
            Phase::Green,
            Phase::Green.tag(ctx.number(), Some(rounds)),
            PromptInput::Stdin(prompt),
            record,
        )?;
    }
}
