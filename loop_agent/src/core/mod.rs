//! Deterministic, pure logic shared by the phase loops.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod task;
pub mod template;
pub mod types;
