//! Invoker abstraction for Terragrunt runs.
//!
//! The [`Invoker`] trait decouples the workflow from the actual `terragrunt`
//! process. Tests use a recording invoker that captures requests without
//! spawning anything.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::planner::IncludeDirective;
use crate::core::types::Phase;
use crate::io::process::{StdinMode, ToolCommand};

/// Everything needed to run one Terragrunt phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Working directory for the Terragrunt process.
    pub workdir: PathBuf,
    pub phase: Phase,
    /// Queue filters derived from the change set.
    pub directives: Vec<IncludeDirective>,
    /// Leave prompts enabled and connect stdin.
    pub interactive: bool,
    /// Directory for Terragrunt's JSON output.
    pub json_out_dir: PathBuf,
}

impl InvokeRequest {
    /// Arguments for `terragrunt`:
    ///
    /// `run --all [--non-interactive] --queue-strict-include [filters]...
    /// --json-out-dir <dir> <phase> -- [-input=false] [-auto-approve]`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--all".to_string()];

        if !self.interactive {
            args.push("--non-interactive".to_string());
        }

        args.push("--queue-strict-include".to_string());
        for directive in &self.directives {
            args.extend(directive.to_args());
        }

        args.push("--json-out-dir".to_string());
        args.push(self.json_out_dir.to_string_lossy().into_owned());
        args.push(self.phase.to_string());
        args.push("--".to_string());

        if !self.interactive {
            args.push("-input=false".to_string());
            if self.phase == Phase::Apply {
                args.push("-auto-approve".to_string());
            }
        }

        args
    }
}

/// Abstraction over Terragrunt execution backends.
pub trait Invoker {
    /// Run the phase and return the process exit code.
    fn invoke(&self, request: &InvokeRequest) -> Result<i32>;
}

/// Invoker that spawns the `terragrunt` executable.
pub struct TerragruntInvoker {
    executable: String,
}

impl TerragruntInvoker {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn command(&self, request: &InvokeRequest) -> ToolCommand {
        ToolCommand::new(&self.executable, request.args(), &request.workdir)
    }
}

impl Invoker for TerragruntInvoker {
    #[instrument(skip_all, fields(phase = %request.phase, interactive = request.interactive))]
    fn invoke(&self, request: &InvokeRequest) -> Result<i32> {
        let cmd = self.command(request);
        info!(
            directives = request.directives.len(),
            "starting terragrunt run --all"
        );

        let stdin = if request.interactive {
            StdinMode::Inherit
        } else {
            StdinMode::Null
        };
        let status = cmd
            .run_attached(stdin)
            .with_context(|| format!("run terragrunt {}", request.phase))?;

        // A child killed by a signal has no exit code.
        let code = status.code().unwrap_or(1);
        if code != 0 {
            warn!(exit_code = code, "terragrunt failed");
        }
        Ok(code)
    }
}
