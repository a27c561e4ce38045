//! I/O adapters for the iteration controller.

pub mod agent;
pub mod config;
pub mod git;
pub mod iteration_log;
pub mod process;
pub mod prompt;
pub mod session;
pub mod tasks;
pub mod transcript;
pub mod validator;
