//! Pending-task queue under `./tasks/`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// List pending tasks: non-directory entries of `tasks_dir`, sorted by file name.
///
/// A missing directory is an empty queue.
pub fn list_pending(tasks_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(tasks_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %tasks_dir.display(), "tasks directory missing");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("read {}", tasks_dir.display())),
    };

    let mut tasks = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", tasks_dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if file_type.is_dir() {
            continue;
        }
        tasks.push(entry.path());
    }
    tasks.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(tasks)
}

pub fn read_task(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read task {}", path.display()))
}

/// Move `path` into `dest_dir`, keeping its file name. Returns the new path.
pub fn archive(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("cannot archive {} (no file name)", path.display()))?;
    let dest = dest_dir.join(name);
    fs::rename(path, &dest)
        .with_context(|| format!("move {} to {}", path.display(), dest.display()))?;
    debug!(from = %path.display(), to = %dest.display(), "archived");
    Ok(dest)
}

/// Repository-relative, `/`-separated reference for prompts and logs.
pub fn display_ref(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// File name of `path` as a string, for summaries.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
