//! I/O helpers for terrahoot commands.

pub mod config;
pub mod git;
pub mod invoker;
pub mod process;
