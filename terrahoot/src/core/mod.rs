//! Deterministic, pure logic shared by terrahoot commands.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod changes;
pub mod env;
pub mod planner;
pub mod platform;
pub mod state;
pub mod types;
