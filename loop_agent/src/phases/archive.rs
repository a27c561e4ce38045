//! ARCHIVE: move the consumed task and `SPEC.md` into the iteration directory.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::warn;

use crate::io::agent::Agent;
use crate::io::tasks::{archive, display_ref};
use crate::io::validator::Validator;
use crate::phases::PhaseContext;
use crate::phases::cleanup::run_cleanup;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archived {
    pub task: Option<PathBuf>,
    pub spec: Option<PathBuf>,
}

/// Archive, then clean up so the deletions under `./tasks/` are committed.
///
/// A file that has already gone (the agent may have moved it) is logged and
/// skipped.
pub fn run_archive<A: Agent, V: Validator>(
    ctx: &mut PhaseContext<'_, A, V>,
    task: &Path,
) -> Result<Archived> {
    let spec_path = ctx.session.paths.spec_path.clone();
    let archived = Archived {
        task: archive_if_present(ctx, task)?,
        spec: archive_if_present(ctx, &spec_path)?,
    };
    run_cleanup(ctx)?;
    Ok(archived)
}

fn archive_if_present<A: Agent, V: Validator>(
    ctx: &PhaseContext<'_, A, V>,
    path: &Path,
) -> Result<Option<PathBuf>> {
    let name = display_ref(ctx.root(), path);
    if !path.exists() {
        ctx.log(format!("[ARCHIVE] {name} is missing, skipping"));
        warn!(path = %path.display(), "nothing to archive");
        return Ok(None);
    }
    let dest = archive(path, &ctx.paths().dir)?;
    ctx.log(format!("[ARCHIVE] {name} -> {}", dest.display()));
    Ok(Some(dest))
}
