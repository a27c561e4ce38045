//! TASK SELECT: pick the first pending task that is still relevant.
//!
//! An empty queue asks the agent to author new tasks. Each candidate is
//! handed to the agent for review first; a task it marks `[OUTDATED]` is
//! archived into the iteration directory and the next one is tried.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::core::task::is_outdated;
use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::prompt::{task_create_prompt, task_filter_prompt};
use crate::io::tasks::{archive, display_ref, list_pending, read_task};
use crate::io::validator::Validator;
use crate::phases::PhaseContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSelection {
    /// Selected task, still under `./tasks/`.
    pub task: PathBuf,
    /// Archived locations of tasks found outdated along the way.
    pub outdated: Vec<PathBuf>,
    pub create_rounds: u32,
}

pub fn select_task<A: Agent, V: Validator>(
    ctx: &mut PhaseContext<'_, A, V>,
) -> Result<TaskSelection> {
    let iteration = ctx.number();
    let tasks_dir = ctx.session.paths.tasks_dir.clone();
    let mut outdated = Vec::new();
    let mut create_rounds = 0;
    let mut filter_rounds = 0;

    loop {
        let pending = list_pending(&tasks_dir)?;
        let Some(task) = pending.into_iter().next() else {
            create_rounds += 1;
            ctx.log("[TASK] No pending tasks, asking the agent to create some");
            let record = ctx.paths().task_create_prompt(create_rounds);
            ctx.invoke_agent(
                Phase::TaskCreate,
                Phase::TaskCreate.tag(iteration, None),
                PromptInput::Arg(task_create_prompt()),
                record,
            )?;
            continue;
        };

        filter_rounds += 1;
        let task_ref = display_ref(ctx.root(), &task);
        debug!(task = %task_ref, round = filter_rounds, "reviewing task");
        let prompt = task_filter_prompt(&task_ref, &read_task(&task)?);
        let record = ctx.paths().task_filter_prompt(filter_rounds);
        ctx.invoke_agent(
            Phase::TaskFilter,
            Phase::TaskFilter.tag(iteration, None),
            PromptInput::Stdin(prompt),
            record,
        )?;

        // The filter may have rewritten the task; decide on what it left.
        if is_outdated(&read_task(&task)?) {
            ctx.log(format!("[FILE] {task_ref} is outdated, archiving"));
            outdated.push(archive(&task, &ctx.paths().dir)?);
            continue;
        }

        ctx.log(format!("[FILE] {task_ref} is up to date"));
        info!(task = %task_ref, "task selected");
        return Ok(TaskSelection {
            task,
            outdated,
            create_rounds,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Phase;
    use crate::test_support::{ScriptedAgent, ScriptedValidator, TestRepo};
    use std::fs;

    #[test]
    fn picks_first_task_by_name() {
        let repo = TestRepo::new().expect("repo");
        repo.write("tasks/002_b.md", "# b").expect("write");
        repo.write("tasks/001_a.md", "# a").expect("write");
        repo.commit_all("chore: tasks").expect("commit");
        let session = repo.start_session().expect("session");
        let agent = ScriptedAgent::new(|_| Ok(()));
        let validator = ScriptedValidator::new(vec![]);
        let mut ctx = PhaseContext::begin(&session, &agent, &validator, 1).expect("begin");

        let selection = select_task(&mut ctx).expect("select");

        assert_eq!(selection.task, repo.path().join("tasks/001_a.md"));
        assert!(selection.outdated.is_empty());
        let record = fs::read_to_string(ctx.paths().task_filter_prompt(1)).expect("record");
        assert!(record.contains("@tasks/001_a.md"));
        assert!(record.ends_with("# a"));
    }

    #[test]
    fn archives_outdated_tasks_and_moves_on() {
        let repo = TestRepo::new().expect("repo");
        repo.write("tasks/001_a.md", "# a").expect("write");
        repo.write("tasks/002_b.md", "# b").expect("write");
        repo.commit_all("chore: tasks").expect("commit");
        let session = repo.start_session().expect("session");

        let root = repo.path().to_path_buf();
        let agent = ScriptedAgent::new(move |req| {
            if req.prompt.text().contains("@tasks/001_a.md") {
                fs::write(root.join("tasks/001_a.md"), "# a\n[OUTDATED]\n")?;
            }
            Ok(())
        });
        let validator = ScriptedValidator::new(vec![]);
        let mut ctx = PhaseContext::begin(&session, &agent, &validator, 1).expect("begin");

        let selection = select_task(&mut ctx).expect("select");

        assert_eq!(selection.task, repo.path().join("tasks/002_b.md"));
        assert_eq!(selection.outdated, vec![ctx.paths().dir.join("001_a.md")]);
        assert!(!repo.path().join("tasks/001_a.md").exists());
        assert!(ctx.paths().task_filter_prompt(2).exists());
        assert_eq!(agent.count(Phase::TaskFilter), 2);
    }

    #[test]
    fn empty_queue_asks_agent_to_create_tasks() {
        let repo = TestRepo::new().expect("repo");
        let session = repo.start_session().expect("session");

        let root = repo.path().to_path_buf();
        let agent = ScriptedAgent::new(move |req| {
            if req.phase == Phase::TaskCreate {
                fs::create_dir_all(root.join("tasks"))?;
                fs::write(root.join("tasks/001_new.md"), "# new")?;
            }
            Ok(())
        });
        let validator = ScriptedValidator::new(vec![]);
        let mut ctx = PhaseContext::begin(&session, &agent, &validator, 1).expect("begin");

        let selection = select_task(&mut ctx).expect("select");

        assert_eq!(selection.task, repo.path().join("tasks/001_new.md"));
        assert_eq!(selection.create_rounds, 1);
        let calls = agent.calls();
        assert!(matches!(calls[0].prompt, PromptInput::Arg(_)));
        assert!(ctx.paths().task_create_prompt(1).exists());
    }
}
