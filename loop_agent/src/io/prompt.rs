//! Prompt assets and prompt records.
//!
//! Templates are embedded at compile time and rendered with literal
//! `{{name}}` substitution (see [`crate::core::template`]). Task and
//! specification bodies are appended verbatim after the rendered template, so
//! text inside them is never treated as a placeholder.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::template::{Bindings, Placeholder, render};
use crate::core::types::ValidateOutcome;

const CLEANUP_TEMPLATE: &str = include_str!("prompts/cleanup.md");
const TASK_CREATE_TEMPLATE: &str = include_str!("prompts/task_create.md");
const TASK_FILTER_TEMPLATE: &str = include_str!("prompts/task_filter.md");
const SPEC_TEMPLATE: &str = include_str!("prompts/spec.md");
const RED_TEMPLATE: &str = include_str!("prompts/red.md");
const GREEN_TEMPLATE: &str = include_str!("prompts/green.md");
const EVOLVE_TEMPLATE: &str = include_str!("prompts/evolve.md");

/// Slash command that asks the agent to (re)initialise its project context.
pub const INIT_PROMPT: &str = "/init";

pub fn cleanup_prompt(files: &str, iteration: u32, attempt: u32) -> String {
    render(
        CLEANUP_TEMPLATE,
        &Bindings::new()
            .bind(Placeholder::Files, files.trim_end())
            .bind(Placeholder::Iteration, iteration.to_string())
            .bind(Placeholder::Attempt, attempt.to_string()),
    )
}

pub fn task_create_prompt() -> String {
    TASK_CREATE_TEMPLATE.trim_end().to_string()
}

/// `task_ref` is the repository-relative task path the agent should edit.
pub fn task_filter_prompt(task_ref: &str, task_body: &str) -> String {
    format!(
        "You are the requirement document maintainer. The requirement document is @{task_ref}. {TASK_FILTER_TEMPLATE}{task_body}"
    )
}

pub fn spec_prompt(validate_script: &str, task_body: &str) -> String {
    with_body(SPEC_TEMPLATE, validate_script, task_body)
}

pub fn red_prompt(validate_script: &str, spec_body: &str) -> String {
    with_body(RED_TEMPLATE, validate_script, spec_body)
}

pub fn green_prompt(validate_script: &str, failure: &ValidateOutcome) -> String {
    render(
        GREEN_TEMPLATE,
        &Bindings::new()
            .bind(Placeholder::Fail, failure.fail_snippet())
            .bind(Placeholder::ValidateScript, validate_script),
    )
}

pub fn evolve_prompt(validate_script: &str, task_body: &str) -> String {
    with_body(EVOLVE_TEMPLATE, validate_script, task_body)
}

/// Persist a rendered prompt. Must complete before the agent is invoked.
pub fn write_prompt_record(path: &Path, prompt: &str) -> Result<()> {
    debug!(path = %path.display(), bytes = prompt.len(), "writing prompt record");
    fs::write(path, prompt).with_context(|| format!("write prompt record {}", path.display()))
}

fn with_body(template: &str, validate_script: &str, body: &str) -> String {
    let mut prompt = render(
        template,
        &Bindings::new().bind(Placeholder::ValidateScript, validate_script),
    );
    prompt.push_str(body);
    prompt
}
