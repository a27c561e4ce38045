//! Iteration controller.
//!
//! Drives the fixed phase sequence of one iteration, with a cleanup at every
//! boundary, and repeats it up to a hard iteration bound. Any agent failure,
//! git failure, or filesystem error aborts the whole loop.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use tracing::info;

use crate::core::types::Phase;
use crate::io::agent::{Agent, PromptInput};
use crate::io::iteration_log::{IterationMeta, write_meta};
use crate::io::prompt::INIT_PROMPT;
use crate::io::session::Session;
use crate::io::tasks::file_name;
use crate::io::validator::Validator;
use crate::phases::PhaseContext;
use crate::phases::archive::run_archive;
use crate::phases::cleanup::run_cleanup;
use crate::phases::evolve::run_evolve;
use crate::phases::green::run_green;
use crate::phases::red::run_red;
use crate::phases::select::select_task;
use crate::phases::specify::run_spec;

/// Hard upper bound on iterations per session.
pub const MAX_ITERATIONS: u32 = 500;

/// Summary of one loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub iterations: u32,
}

/// Run iterations `1..=max_iterations`, calling `on_iteration` after each.
pub fn run_loop<A: Agent, V: Validator, F: FnMut(&IterationMeta)>(
    session: &Session,
    agent: &A,
    validator: &V,
    max_iterations: u32,
    mut on_iteration: F,
) -> Result<LoopOutcome> {
    for number in 1..=max_iterations {
        let meta = run_iteration(session, agent, validator, number)
            .with_context(|| format!("iteration {number}"))?;
        on_iteration(&meta);
    }
    session.log(format!("[LOOP] Reached the iteration bound of {max_iterations}"));
    Ok(LoopOutcome {
        iterations: max_iterations,
    })
}

/// Run one full iteration and write its `meta.json`.
///
/// Sequence: CLEANUP, INIT, CLEANUP, SELECT, CLEANUP, SPEC, CLEANUP, RED,
/// CLEANUP, GREEN, CLEANUP, EVOLVE, ARCHIVE (which ends with a CLEANUP).
pub fn run_iteration<A: Agent, V: Validator>(
    session: &Session,
    agent: &A,
    validator: &V,
    number: u32,
) -> Result<IterationMeta> {
    let started_at = Local::now();
    let start = Instant::now();
    let _span = session.transcript.span(format!("ITER-{number}"));
    let mut ctx = PhaseContext::begin(session, agent, validator, number)?;

    run_cleanup(&mut ctx)?;
    let record = ctx.paths().init_prompt();
    ctx.invoke_agent(
        Phase::Init,
        Phase::Init.tag(number, None),
        PromptInput::Arg(INIT_PROMPT.to_string()),
        record,
    )?;

    run_cleanup(&mut ctx)?;
    let selection = select_task(&mut ctx)?;

    run_cleanup(&mut ctx)?;
    let spec = run_spec(&mut ctx, &selection.task)?;

    run_cleanup(&mut ctx)?;
    let red_tries = run_red(&mut ctx, &spec.spec_body)?;

    run_cleanup(&mut ctx)?;
    let green_rounds = run_green(&mut ctx)?;

    run_cleanup(&mut ctx)?;
    run_evolve(&mut ctx, &spec.task_body)?;

    run_archive(&mut ctx, &selection.task)?;

    let meta = IterationMeta {
        iteration: number,
        task: file_name(&selection.task),
        outdated: selection.outdated.iter().map(|p| file_name(p)).collect(),
        spec_invocations: spec.invocations,
        red_tries,
        green_rounds,
        cleanup_attempt: ctx.iteration.cleanup_attempt,
        started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        ended_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    write_meta(&ctx.paths().meta_path, &meta)?;
    info!(iteration = number, task = %meta.task, red_tries, green_rounds, "iteration complete");
    Ok(meta)
}
