//! Shared deterministic types for the iteration controller.
//!
//! These types define stable contracts between the phase loops and the I/O
//! adapters. They carry no I/O and render identically across runs.

/// Kind of agent invocation within an iteration.
///
/// Each kind maps to a prompt template and a transcript tag; the phase loops
/// around these invocations own the termination predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Cleanup,
    Init,
    TaskCreate,
    TaskFilter,
    Spec,
    Red,
    Green,
    Evolve,
}

impl Phase {
    /// Label used inside transcript tags.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Cleanup => "CLEANUP",
            Phase::Init => "AGENT-INIT",
            Phase::TaskCreate => "AGENT-TASK-CREATE",
            Phase::TaskFilter => "AGENT-TASK-FILTER",
            Phase::Spec => "AGENT-SPEC",
            Phase::Red => "AGENT-RED",
            Phase::Green => "AGENT-GREEN",
            Phase::Evolve => "AGENT-EVOLVE",
        }
    }

    /// Transcript tag for one invocation, e.g. `ITER-3-AGENT-GREEN-2`.
    ///
    /// `attempt` is appended for phases that keep one transcript per try.
    pub fn tag(self, iteration: u32, attempt: Option<u32>) -> String {
        match attempt {
            Some(attempt) => format!("ITER-{iteration}-{}-{attempt}", self.as_str()),
            None => format!("ITER-{iteration}-{}", self.as_str()),
        }
    }
}

/// Result of one validator invocation.
///
/// A non-zero `exit_code` is expected signal, never an error: it drives the
/// RED and GREEN loops. `-1` means the validator could not be started or was
/// killed without an exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub exit_code: i32,
    /// Combined stdout and stderr, in arrival order.
    pub output: String,
    pub timed_out: bool,
}

impl ValidateOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    /// Failure snippet fed to the GREEN prompt as `{{FAIL}}`.
    pub fn fail_snippet(&self) -> String {
        format!("[exit code:{}]{}", self.exit_code, self.output)
    }
}
