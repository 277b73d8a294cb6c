//! Change-scoped Terragrunt runs for CI/CD workflows.
//!
//! terrahoot looks at the files changed since a base reference, works out which
//! Terragrunt units they affect, and runs `plan` or `apply` over exactly those
//! units. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (change classification, unit
//!   selection, platform detection, workflow states). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting operations (config files, git, Terragrunt).
//!   Isolated behind small wrappers and traits so tests can substitute them.
//!
//! Orchestration modules ([`workflow`], [`changed_files`], [`platform`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod changed_files;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod platform;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
