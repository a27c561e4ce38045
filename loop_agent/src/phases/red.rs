//! RED: get a failing test in place before any implementation.

use anyhow::Result;

use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::prompt::red_prompt;
use crate::io::validator::Validator;
use crate::phases::PhaseContext;

/// Invoke the agent, then validate, until the validator exits non-zero.
///
/// Returns the number of tries. Each try keeps its own transcript.
pub fn run_red<A: Agent, V: Validator>(
    ctx: &mut PhaseContext<'_, A, V>,
    spec_body: &str,
) -> Result<u32> {
    let prompt = red_prompt(&ctx.session.validate_script, spec_body);
    let mut tries = 0;
    loop {
        tries += 1;
        let record = ctx.paths().red_prompt();
        ctx.invoke_agent(
            Phase::Red,
            Phase::Red.tag(ctx.number(), Some(tries)),
            PromptInput::Stdin(prompt.clone()),
            record,
        )?;

        if !ctx.validate().passed() {
            ctx.log("[RED] Validate failed, a failing test is in place");
            return Ok(tries);
        }
        ctx.log("[RED] Validate succeeded, asking again for a failing test");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedAgent, ScriptedValidator, TestRepo};

    #[test]
    fn repeats_until_validator_fails() {
        let repo = TestRepo::new().expect("repo");
        let session = repo.start_session().expect("session");
        let agent = ScriptedAgent::new(|_| Ok(()));
        let validator = ScriptedValidator::new(vec![0, 0, 1]);
        let mut ctx = PhaseContext::begin(&session, &agent, &validator, 1).expect("begin");

        let tries = run_red(&mut ctx, "- it works").expect("red");

        assert_eq!(tries, 3);
        validator.assert_drained();
        for k in 1..=3 {
            assert!(ctx.paths().transcript(&format!("ITER-1-AGENT-RED-{k}")).exists());
        }
        let record = std::fs::read_to_string(ctx.paths().red_prompt()).expect("record");
        assert!(record.ends_with("- it works"));
    }
}
