//! Helpers for running external tools to completion.
//!
//! Every failure carries the executable name and its arguments so that errors
//! surfaced at the top level say exactly which invocation went wrong.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument};

/// A fully specified invocation of an external executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub executable: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

/// How the child's stdin is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinMode {
    Inherit,
    Null,
}

impl ToolCommand {
    pub fn new<I, S>(executable: &str, args: I, workdir: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            workdir: workdir.to_path_buf(),
        }
    }

    /// `executable arg1 arg2 ...`, for messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.executable.clone()
        } else {
            format!("{} {}", self.executable, self.args.join(" "))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args).current_dir(&self.workdir);
        cmd
    }

    /// Run and capture stdout/stderr without checking the exit status.
    pub fn output(&self) -> Result<Output> {
        debug!(command = %self.display(), "running tool");
        self.command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawn {}", self.display()))
    }

    /// Run and return stdout; a non-zero exit is an error carrying stderr.
    pub fn output_checked(&self) -> Result<String> {
        let output = self.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} failed ({}): {}",
                self.display(),
                describe_status(output.status),
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Non-blank stdout lines.
    pub fn output_lines(&self) -> Result<Vec<String>> {
        let stdout = self.output_checked()?;
        Ok(stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Exactly one non-blank line of stdout.
    pub fn output_line(&self) -> Result<String> {
        let mut lines = self.output_lines()?;
        match lines.len() {
            1 => Ok(lines.remove(0).trim().to_string()),
            0 => Err(anyhow!(
                "{}: expected one line of output, but got none",
                self.display()
            )),
            n => Err(anyhow!(
                "{}: expected one line of output, but got {n}",
                self.display()
            )),
        }
    }

    /// Run with stdout/stderr connected to this process and wait for exit.
    #[instrument(skip_all, fields(executable = %self.executable))]
    pub fn run_attached(&self, stdin: StdinMode) -> Result<ExitStatus> {
        let mut cmd = self.command();
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        match stdin {
            StdinMode::Inherit => cmd.stdin(Stdio::inherit()),
            StdinMode::Null => cmd.stdin(Stdio::null()),
        };

        debug!(command = %self.display(), ?stdin, "spawning attached child process");
        let status = match cmd.status() {
            Ok(status) => status,
            Err(e) => {
                error!(err = %e, "failed to spawn command");
                return Err(e).with_context(|| format!("spawn {}", self.display()));
            }
        };
        debug!(exit_code = ?status.code(), "command finished");
        Ok(status)
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", ["-c", script], Path::new("."))
    }

    #[test]
    fn display_joins_executable_and_args() {
        let cmd = ToolCommand::new("git", ["diff", "--name-status"], Path::new("."));
        assert_eq!(cmd.display(), "git diff --name-status");
    }

    #[test]
    fn output_line_requires_exactly_one_line() {
        assert_eq!(sh("echo hello").output_line().expect("line"), "hello");

        let err = sh("true").output_line().expect_err("none");
        assert!(err.to_string().contains("got none"));

        let err = sh("printf 'a\\nb\\n'").output_line().expect_err("many");
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn failure_carries_command_and_stderr() {
        let err = sh("echo boom >&2; exit 3")
            .output_checked()
            .expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("sh -c"), "{msg}");
        assert!(msg.contains("exit status 3"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[test]
    fn spawn_failure_names_the_executable() {
        let cmd = ToolCommand::new(
            "terrahoot-definitely-missing-tool",
            ["--version"],
            Path::new("."),
        );
        let err = cmd.output().expect_err("should fail");
        assert!(format!("{err:#}").contains("terrahoot-definitely-missing-tool --version"));
    }

    #[test]
    fn attached_run_reports_exit_code() {
        let status = sh("exit 7").run_attached(StdinMode::Null).expect("run");
        assert_eq!(status.code(), Some(7));
    }

    #[test]
    fn workdir_is_honored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cmd = ToolCommand::new("sh", ["-c", "ls"], temp.path());
        std::fs::write(temp.path().join("marker.txt"), "").expect("write");
        assert_eq!(cmd.output_line().expect("ls"), "marker.txt");
    }
}
