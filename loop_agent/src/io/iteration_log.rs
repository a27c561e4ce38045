//! Iteration directory layout and the per-iteration summary.
//!
//! Everything an iteration produces lives under `iter-<n>/`: prompt records,
//! transcripts, archived tasks, the archived `SPEC.md`, and `meta.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct IterationPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
}

impl IterationPaths {
    pub fn new(iteration_dir: impl Into<PathBuf>) -> Self {
        let dir = iteration_dir.into();
        Self {
            meta_path: dir.join("meta.json"),
            dir,
        }
    }

    /// Create the directory. Must happen before any phase writes into it.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create iteration dir {}", self.dir.display()))
    }

    /// Transcript record for a subprocess tag, `<TAG>.txt`.
    pub fn transcript(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{tag}.txt"))
    }

    pub fn init_prompt(&self) -> PathBuf {
        self.dir.join("init-prompt.txt")
    }

    pub fn cleanup_prompt(&self, attempt: u32) -> PathBuf {
        self.dir.join(format!("cleanup-{attempt}-prompt.txt"))
    }

    pub fn task_create_prompt(&self, round: u32) -> PathBuf {
        self.dir.join(format!("task-create-{round}-prompt.txt"))
    }

    pub fn task_filter_prompt(&self, round: u32) -> PathBuf {
        self.dir.join(format!("task-filter-prompt-{round}.txt"))
    }

    pub fn spec_prompt(&self) -> PathBuf {
        self.dir.join("spec-prompt.txt")
    }

    pub fn red_prompt(&self) -> PathBuf {
        self.dir.join("red-prompt.txt")
    }

    pub fn green_prompt(&self, round: u32) -> PathBuf {
        self.dir.join(format!("green-{round}-prompt.txt"))
    }

    pub fn evolve_prompt(&self) -> PathBuf {
        self.dir.join("evolve-prompt.txt")
    }
}

/// Summary written to `iter-<n>/meta.json` once an iteration completes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IterationMeta {
    pub iteration: u32,
    /// File name of the task consumed by this iteration.
    pub task: String,
    /// File names of tasks archived as outdated during selection.
    pub outdated: Vec<String>,
    pub spec_invocations: u32,
    pub red_tries: u32,
    pub green_rounds: u32,
    /// Cleanup attempt counter at iteration end (starts at 1).
    pub cleanup_attempt: u32,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
}

pub fn write_meta(path: &Path, meta: &IterationMeta) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(meta).context("serialize iteration meta")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_names_are_stable() {
        let paths = IterationPaths::new("/s/iter-2");

        assert!(paths.meta_path.ends_with("iter-2/meta.json"));
        assert!(paths.transcript("ITER-2-AGENT-RED-1").ends_with("ITER-2-AGENT-RED-1.txt"));
        assert!(paths.cleanup_prompt(3).ends_with("cleanup-3-prompt.txt"));
        assert!(paths.task_filter_prompt(2).ends_with("task-filter-prompt-2.txt"));
        assert!(paths.task_create_prompt(1).ends_with("task-create-1-prompt.txt"));
        assert!(paths.green_prompt(4).ends_with("green-4-prompt.txt"));
        assert!(paths.spec_prompt().ends_with("spec-prompt.txt"));
        assert!(paths.red_prompt().ends_with("red-prompt.txt"));
        assert!(paths.evolve_prompt().ends_with("evolve-prompt.txt"));
        assert!(paths.init_prompt().ends_with("init-prompt.txt"));
    }

    #[test]
    fn writes_meta_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = IterationPaths::new(temp.path().join("iter-1"));
        paths.create().expect("create");

        let meta = IterationMeta {
            iteration: 1,
            task: "001_x.md".to_string(),
            outdated: vec!["000_old.md".to_string()],
            spec_invocations: 1,
            red_tries: 2,
            green_rounds: 0,
            cleanup_attempt: 3,
            started_at: "2025-01-01T12:00:00+00:00".to_string(),
            ended_at: "2025-01-01T12:05:00+00:00".to_string(),
            duration_ms: 300_000,
        };
        write_meta(&paths.meta_path, &meta).expect("write");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.meta_path).expect("read"))
                .expect("parse");
        assert_eq!(value["task"], "001_x.md");
        assert_eq!(value["outdated"][0], "000_old.md");
        assert_eq!(value["red_tries"], 2);
    }
}
