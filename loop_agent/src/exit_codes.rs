//! Stable exit codes for the `loop-agent` binary.

/// The loop reached its iteration bound.
pub const OK: i32 = 0;
/// Startup, agent, git, or filesystem failure aborted the session.
pub const FATAL: i32 = 1;
