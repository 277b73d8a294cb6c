//! Stable exit codes for terrahoot CLI commands.
//!
//! A Terragrunt run exits with Terragrunt's own exit code instead.

/// Command succeeded.
pub const OK: i32 = 0;
/// Any propagated error: git or Terragrunt failure, unsupported change status,
/// undetectable platform, or a workflow precondition that refused to proceed.
pub const FAILURE: i32 = 1;
