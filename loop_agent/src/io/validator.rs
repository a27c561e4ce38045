//! Validator adapter for the project-supplied validation script.
//!
//! Unlike agent invocations, a failing validator is expected signal: the exit
//! code and combined output flow back as data into the RED and GREEN loops.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{instrument, warn};

use crate::core::types::ValidateOutcome;
use crate::io::process::{exit_code, run_captured_with_timeout};

/// Hard wall-clock bound on a single validator invocation.
pub const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Validation script for the host platform.
pub fn platform_script() -> &'static str {
    if cfg!(windows) {
        r".\validate.bat"
    } else {
        "./validate.sh"
    }
}

pub trait Validator {
    /// Run the validator once. Never fails: spawn errors become exit code `-1`.
    fn validate(&self) -> ValidateOutcome;
}

/// Runs the validation script from the repository root.
#[derive(Debug, Clone)]
pub struct ScriptValidator {
    workdir: PathBuf,
    script: String,
    timeout: Duration,
}

impl ScriptValidator {
    pub fn new(workdir: impl Into<PathBuf>, script: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            script: script.into(),
            timeout: VALIDATE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Validator for ScriptValidator {
    #[instrument(skip_all, fields(script = %self.script))]
    fn validate(&self) -> ValidateOutcome {
        let mut cmd = Command::new(self.workdir.join(&self.script));
        cmd.current_dir(&self.workdir);

        let run = match run_captured_with_timeout(cmd, self.timeout) {
            Ok(run) => run,
            Err(err) => {
                warn!(err = %err, "validator could not be run");
                return ValidateOutcome {
                    exit_code: -1,
                    output: format!("{err:#}"),
                    timed_out: false,
                };
            }
        };

        let mut output = String::from_utf8_lossy(&run.output).into_owned();
        let mut code = exit_code(run.status);
        if run.timed_out {
            output.push_str(&format!("\nvalidator timed out after {:?}\n", self.timeout));
            if code == 0 {
                code = -1;
            }
        }
        ValidateOutcome {
            exit_code: code,
            output,
            timed_out: run.timed_out,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Instant;

    fn write_script(dir: &Path, body: &str) {
        let path = dir.join("validate.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
    }

    #[test]
    fn passing_script_returns_zero() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_script(temp.path(), "echo all good");

        let outcome = ScriptValidator::new(temp.path(), "./validate.sh").validate();
        assert!(outcome.passed());
        assert!(outcome.output.contains("all good"));
    }

    #[test]
    fn failing_script_reports_code_and_combined_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_script(temp.path(), "echo to-stdout\necho to-stderr 1>&2\nexit 4");

        let outcome = ScriptValidator::new(temp.path(), "./validate.sh").validate();
        assert_eq!(outcome.exit_code, 4);
        assert!(outcome.output.contains("to-stdout"));
        assert!(outcome.output.contains("to-stderr"));
        assert!(!outcome.timed_out);
    }

    #[test]
    fn missing_script_returns_minus_one() {
        let temp = tempfile::tempdir().expect("tempdir");

        let outcome = ScriptValidator::new(temp.path(), "./validate.sh").validate();
        assert_eq!(outcome.exit_code, -1);
        assert!(outcome.output.contains("spawn"));
    }

    #[test]
    fn timeout_kills_and_returns_non_zero() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_script(temp.path(), "echo working\nexec sleep 30");

        let start = Instant::now();
        let outcome = ScriptValidator::new(temp.path(), "./validate.sh")
            .with_timeout(Duration::from_millis(300))
            .validate();

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(outcome.timed_out);
        assert_ne!(outcome.exit_code, 0);
        assert!(outcome.output.contains("working"));
        assert!(outcome.output.contains("validator timed out after 300ms"));
    }

    #[test]
    fn background_child_holding_pipes_cannot_stretch_the_bound() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_script(temp.path(), "echo failing
sleep 10 &
exit 1");

        let start = Instant::now();
        let outcome = ScriptValidator::new(temp.path(), "./validate.sh")
            .with_timeout(Duration::from_secs(1))
            .validate();

        // Bound plus the reader drain grace.
        assert!(
            start.elapsed() < Duration::from_secs(6),
            "validate() took {:?} with a 1s bound",
            start.elapsed()
        );
        assert_eq!(outcome.exit_code, 1);
        assert!(!outcome.timed_out);
        assert!(outcome.output.contains("failing"));
    }
}
