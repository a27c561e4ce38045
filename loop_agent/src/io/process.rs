//! Helpers for running child processes.
//!
//! Two shapes are needed: agent and git commands stream every output line into
//! the transcript as it arrives, while the validator captures combined output
//! under a hard wall-clock bound. Both read stdout and stderr on dedicated
//! threads so a chatty child can never deadlock on a full pipe.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::transcript::Transcript;

/// How long output readers may run past the timeout (or past the kill of a
/// timed-out child) before they are abandoned.
///
/// Grandchildren may keep the pipes open; past this grace the readers are
/// abandoned so the caller's bound holds.
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Outcome of a streamed run.
#[derive(Debug)]
pub struct StreamedRun {
    pub status: ExitStatus,
    /// Rendered command line, as logged in the `[EXEC]` preamble.
    pub command: String,
    pub duration: Duration,
}

/// Run `cmd`, mirroring its output into the transcript line-by-line.
///
/// For the duration of the call the transcript also fans out into
/// `transcript_path` (opened for append). The record starts with an
/// `[EXEC] command:` preamble, carries one `[<tag>-STDOUT]`/`[<tag>-STDERR]`
/// line per output line, and ends with an exit/duration footer. Both readers
/// have drained before this returns.
///
/// A non-zero exit is returned as data; callers decide whether it is fatal.
#[instrument(skip_all, fields(tag = %tag))]
pub fn run_streamed(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    tag: &str,
    transcript: &Transcript,
    transcript_path: &Path,
) -> Result<StreamedRun> {
    let _scope = transcript.scope(transcript_path)?;
    let command = render_command(&cmd);
    transcript.line(format!("[EXEC] command: {command}"));
    let start = Instant::now();

    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            transcript.line(format!("[EXEC] {command} error: {e}"));
            return Err(e).with_context(|| format!("spawn {command}"));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = spawn_line_reader(stdout, format!("[{tag}-STDOUT]"), transcript.clone());
    let stderr_handle = spawn_line_reader(stderr, format!("[{tag}-STDERR]"), transcript.clone());

    if let Some(input) = stdin {
        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        match child_stdin.write_all(input) {
            Ok(()) => {}
            // The child may legitimately exit without reading its prompt.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                warn!("child closed stdin before the prompt was fully written");
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e).context("write stdin");
            }
        }
        // Dropping the handle closes the pipe so the child sees EOF.
    }

    let status = child.wait().context("wait for command")?;
    join_reader(stdout_handle).context("join stdout")?;
    join_reader(stderr_handle).context("join stderr")?;

    let duration = start.elapsed();
    transcript.line(format!(
        "[EXEC] {tag} exit code: {} seconds: {}",
        exit_code(status),
        duration.as_secs_f64()
    ));
    debug!(exit_code = ?status.code(), "command finished");
    Ok(StreamedRun {
        status,
        command,
        duration,
    })
}

/// Captured output of a bounded run.
#[derive(Debug)]
pub struct CapturedRun {
    pub status: ExitStatus,
    /// Combined stdout and stderr in arrival order.
    pub output: Vec<u8>,
    pub timed_out: bool,
}

/// Run `cmd` with a wall-clock `timeout`, capturing combined stdout/stderr.
///
/// On timeout the child is killed and `timed_out` is set; whatever output had
/// arrived is kept.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
pub fn run_captured_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CapturedRun> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {}", render_command(&cmd)))?;
    let deadline = Instant::now() + timeout;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let combined = Arc::new(Mutex::new(Vec::new()));
    let stdout_handle = spawn_chunk_reader(stdout, combined.clone());
    let stderr_handle = spawn_chunk_reader(stderr, combined.clone());

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    // A background grandchild may keep the pipes open after the child exits;
    // the readers never outlive the bound plus the drain grace.
    let drain_deadline = if timed_out {
        Instant::now() + KILL_DRAIN_GRACE
    } else {
        deadline + KILL_DRAIN_GRACE
    };
    join_reader_until(stdout_handle, drain_deadline).context("join stdout")?;
    join_reader_until(stderr_handle, drain_deadline).context("join stderr")?;

    let output = combined
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CapturedRun {
        status,
        output,
        timed_out,
    })
}

/// Exit code of a finished child, `-1` when it was terminated by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Render a command as `program arg1 arg2 ...` for logs.
pub fn render_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn spawn_line_reader<R: Read + Send + 'static>(
    reader: R,
    prefix: String,
    transcript: Transcript,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).context("read line")?;
            if n == 0 {
                return Ok(());
            }
            let text = String::from_utf8_lossy(&line);
            transcript.line(format!("{prefix} {}", text.trim_end_matches(['\n', '\r'])));
        }
    })
}

fn spawn_chunk_reader<R: Read + Send + 'static>(
    mut reader: R,
    sink: Arc<Mutex<Vec<u8>>>,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk).context("read output")?;
            if n == 0 {
                return Ok(());
            }
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]);
        }
    })
}

fn join_reader(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn join_reader_until(handle: JoinHandle<Result<()>>, deadline: Instant) -> Result<()> {
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("output pipe still held open past the deadline, abandoning reader");
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    join_reader(handle)
}
