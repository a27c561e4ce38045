//! SPEC: have the agent turn the selected task into `SPEC.md`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::prompt::spec_prompt;
use crate::io::tasks::read_task;
use crate::io::validator::Validator;
use crate::phases::PhaseContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutcome {
    /// Task body as read before `SPEC.md` was written; reused by EVOLVE.
    pub task_body: String,
    /// `SPEC.md` contents once it exists.
    pub spec_body: String,
    pub invocations: u32,
}

/// Invoke the agent until `SPEC.md` exists at the repository root.
///
/// A `SPEC.md` left over from an interrupted iteration is reused as-is.
pub fn run_spec<A: Agent, V: Validator>(
    ctx: &mut PhaseContext<'_, A, V>,
    task: &Path,
) -> Result<SpecOutcome> {
    let spec_path = ctx.session.paths.spec_path.clone();
    let task_body = read_task(task)?;
    let prompt = spec_prompt(&ctx.session.validate_script, &task_body);

    if spec_path.exists() {
        ctx.log("[FILE] SPEC.md already exists, reusing it");
        warn!(path = %spec_path.display(), "reusing existing SPEC.md");
    }

    let mut invocations = 0;
    while !spec_path.exists() {
        invocations += 1;
        let record = ctx.paths().spec_prompt();
        ctx.invoke_agent(
            Phase::Spec,
            Phase::Spec.tag(ctx.number(), None),
            PromptInput::Stdin(prompt.clone()),
            record,
        )?;
    }
    ctx.log("[FILE] SPEC.md exists");

    let spec_body = fs::read_to_string(&spec_path)
        .with_context(|| format!("read {}", spec_path.display()))?;
    Ok(SpecOutcome {
        task_body,
        spec_body,
        invocations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedAgent, ScriptedValidator, TestRepo};

    #[test]
    fn retries_until_spec_exists() {
        let repo = TestRepo::new().expect("repo");
        repo.write("tasks/001_a.md", "# a").expect("write");
        let session = repo.start_session().expect("session");

        let root = repo.path().to_path_buf();
        let mut calls = 0;
        let agent = ScriptedAgent::new(move |_| {
            calls += 1;
            if calls == 2 {
                fs::write(root.join("SPEC.md"), "## 可验证验收标准\n- a works\n")?;
            }
            Ok(())
        });
        let validator = ScriptedValidator::new(vec![]);
        let mut ctx = PhaseContext::begin(&session, &agent, &validator, 1).expect("begin");

        let outcome = run_spec(&mut ctx, &repo.path().join("tasks/001_a.md")).expect("spec");

        assert_eq!(outcome.invocations, 2);
        assert_eq!(outcome.task_body, "# a");
        assert!(outcome.spec_body.contains("a works"));
        let record = fs::read_to_string(ctx.paths().spec_prompt()).expect("record");
        assert!(record.contains("@./validate.sh") || record.contains(r"@.\validate.bat"));
        assert!(record.ends_with("# a"));
    }

    #[test]
    fn existing_spec_is_reused_without_invoking() {
        let repo = TestRepo::new().expect("repo");
        repo.write("tasks/001_a.md", "# a").expect("write");
        repo.write("SPEC.md", "leftover").expect("write");
        let session = repo.start_session().expect("session");
        let agent = ScriptedAgent::new(|_| Ok(()));
        let validator = ScriptedValidator::new(vec![]);
        let mut ctx = PhaseContext::begin(&session, &agent, &validator, 1).expect("begin");

        let outcome = run_spec(&mut ctx, &repo.path().join("tasks/001_a.md")).expect("spec");

        assert_eq!(outcome.invocations, 0);
        assert_eq!(outcome.spec_body, "leftover");
        assert!(agent.calls().is_empty());
    }
}
