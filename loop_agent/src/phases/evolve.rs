//! EVOLVE: ask the agent for follow-up tasks.

use anyhow::Result;

use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::prompt::evolve_prompt;
use crate::io::validator::Validator;
use crate::phases::PhaseContext;

/// Single invocation. Whatever tasks it writes are picked up by later
/// iterations.
pub fn run_evolve<A: Agent, V: Validator>(
    ctx: &mut PhaseContext<'_, A, V>,
    task_body: &str,
) -> Result<()> {
    let prompt = evolve_prompt(&ctx.session.validate_script, task_body);
    let record = ctx.paths().evolve_prompt();
    ctx.invoke_agent(
        Phase::Evolve,
        Phase::Evolve.tag(ctx.number(), None),
        PromptInput::Stdin(prompt),
        record,
    )
}
