//! Autonomous test-driven development loop around an external coding agent.
//!
//! Each iteration picks the next task from `./tasks/`, has the agent write a
//! `SPEC.md`, drives a red/green cycle against the project's validation
//! script, asks for follow-up tasks, and archives what it consumed. The
//! working tree is brought back to clean at every phase boundary.
//!
//! - **[`core`]**: Pure logic (phase tags, template rendering, task markers).
//!   No I/O.
//! - **[`io`]**: Side-effecting adapters (git, subprocesses, transcript,
//!   session layout). Behind traits where tests need doubles.
//! - **[`phases`]**: One module per phase loop, each owning its termination
//!   predicate.
//!
//! [`start`] creates a session and [`looping`] drives iterations over it.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod phases;
pub mod start;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
