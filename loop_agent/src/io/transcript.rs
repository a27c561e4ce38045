//! Transcript sink: the product log of a session.
//!
//! Every line goes to stdout (unless silenced), to the session-wide `log`
//! file, and, while a [`TranscriptScope`] is alive, to one per-phase file.
//! Dropping the scope restores the previous target, so callers outside it
//! never see the override, including on early `?` returns and panics.
//!
//! This is separate from `tracing` diagnostics (see [`crate::logging`]):
//! transcripts are always written and are unaffected by `RUST_LOG`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

/// Whether transcript lines are echoed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Stdout,
    Silent,
}

/// Shared, thread-safe line sink. Clones write to the same targets.
#[derive(Debug, Clone)]
pub struct Transcript {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    echo: Echo,
    targets: Mutex<Targets>,
}

#[derive(Debug)]
struct Targets {
    log: File,
    phase: Option<File>,
}

impl Transcript {
    /// Open the session log at `log_path` for append.
    pub fn open(log_path: &Path, echo: Echo) -> Result<Self> {
        let log = open_append(log_path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                echo,
                targets: Mutex::new(Targets { log, phase: None }),
            }),
        })
    }

    /// Write one timestamped line to every active target.
    ///
    /// The line is the atomic unit: concurrent callers never interleave
    /// within a line.
    pub fn line(&self, message: impl AsRef<str>) {
        let stamped = format!(
            "{} {}\n",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            message.as_ref()
        );
        let mut targets = self.lock();
        if self.inner.echo == Echo::Stdout {
            let mut stdout = std::io::stdout().lock();
            if let Err(err) = stdout.write_all(stamped.as_bytes()) {
                warn!(err = %err, "failed to echo transcript line");
            }
        }
        if let Err(err) = targets.log.write_all(stamped.as_bytes()) {
            warn!(err = %err, "failed to write session log");
        }
        if let Some(phase) = targets.phase.as_mut()
            && let Err(err) = phase.write_all(stamped.as_bytes())
        {
            warn!(err = %err, "failed to write phase transcript");
        }
    }

    /// Fan lines out into `path` as well, until the returned scope is dropped.
    pub fn scope(&self, path: &Path) -> Result<TranscriptScope> {
        let file = open_append(path)?;
        let previous = self.lock().phase.replace(file);
        Ok(TranscriptScope {
            transcript: self.clone(),
            previous,
        })
    }

    /// Log `[tag] begin` now and `[tag] end seconds: <n>` when the span drops.
    pub fn span(&self, tag: impl Into<String>) -> TimingSpan {
        let tag = tag.into();
        self.line(format!("[{tag}] begin"));
        TimingSpan {
            transcript: self.clone(),
            tag,
            start: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Targets> {
        self.inner
            .targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Active per-phase override; restores the previous target on drop.
#[derive(Debug)]
pub struct TranscriptScope {
    transcript: Transcript,
    previous: Option<File>,
}

impl Drop for TranscriptScope {
    fn drop(&mut self) {
        self.transcript.lock().phase = self.previous.take();
    }
}

/// Begin/end timing lines around a unit of work.
#[derive(Debug)]
pub struct TimingSpan {
    transcript: Transcript,
    tag: String,
    start: Instant,
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        self.transcript.line(format!(
            "[{}] end seconds: {}",
            self.tag,
            self.start.elapsed().as_secs_f64()
        ));
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open transcript {}", path.display()))
}
