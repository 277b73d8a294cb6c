//! Test-only helpers: throwaway Git repositories and a recording invoker.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::io::invoker::{InvokeRequest, Invoker};

/// A Git repository in a temp directory, on branch `main`, with one commit.
pub struct TestRepo {
    dir: TempDir,
    remote: Option<TempDir>,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        let repo = Self { dir, remote: None };
        repo.git(&["init", "--quiet", "--initial-branch=main"])?;
        repo.git(&["config", "user.name", "terrahoot-test"])?;
        repo.git(&["config", "user.email", "terrahoot-test@example.com"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.write_file("README.md", "infrastructure\n")?;
        repo.commit_all("initial")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a bare `origin`, push `main` to it and track it.
    pub fn add_remote(&mut self) -> Result<()> {
        let remote = tempfile::tempdir().context("create temp remote dir")?;
        run_git(
            remote.path(),
            &["init", "--quiet", "--bare", "--initial-branch=main"],
        )?;
        let url = remote.path().to_string_lossy().into_owned();
        self.git(&["remote", "add", "origin", &url])?;
        self.git(&["push", "--quiet", "-u", "origin", "main"])?;
        self.remote = Some(remote);
        Ok(())
    }

    pub fn git(&self, args: &[&str]) -> Result<String> {
        run_git(self.path(), args)
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn remove_file(&self, rel: &str) -> Result<()> {
        let path = self.path().join(rel);
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))
    }

    /// Stage everything and commit.
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    pub fn push(&self) -> Result<()> {
        self.git(&["push", "--quiet"])?;
        Ok(())
    }

    pub fn head(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Invoker that records requests and returns a fixed exit code.
pub struct RecordingInvoker {
    exit_code: i32,
    requests: RefCell<Vec<InvokeRequest>>,
}

impl RecordingInvoker {
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests.borrow().clone()
    }
}

impl Invoker for RecordingInvoker {
    fn invoke(&self, request: &InvokeRequest) -> Result<i32> {
        self.requests.borrow_mut().push(request.clone());
        Ok(self.exit_code)
    }
}
