//! Git adapter for terrahoot.
//!
//! The workflow needs a handful of very specific answers from the repository
//! (is the work tree clean, is it in sync with its upstream, what changed since
//! the base ref), so we keep a small, explicit wrapper around `git` subprocess
//! calls instead of a general-purpose binding.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::changes::{ChangeSet, kind_for_status_code, parse_name_status_nul};
use crate::io::process::ToolCommand;

pub const DEFAULT_GIT_EXECUTABLE: &str = "git";
pub const DEFAULT_REMOTE: &str = "origin";

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file, relative to the repository root. For
    /// renames and copies this is the new path.
    pub path: String,
}

/// Which changes [`WorkTree::changed_files`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeSource {
    /// Only the committed diff between the base ref and `HEAD`.
    #[default]
    Committed,
    /// The committed diff plus staged, unstaged and untracked files.
    CommittedAndWorkingCopy,
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    executable: String,
    remote: String,
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            executable: DEFAULT_GIT_EXECUTABLE.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            workdir: workdir.into(),
        }
    }

    pub fn with_settings(workdir: impl Into<PathBuf>, executable: &str, remote: &str) -> Self {
        Self {
            executable: executable.to_string(),
            remote: remote.to_string(),
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Resolve the enclosing work tree.
    #[instrument(skip_all)]
    pub fn work_tree(&self) -> Result<WorkTree> {
        let toplevel = self
            .command(&["rev-parse", "--show-toplevel"])
            .output_line()
            .context("find Git work tree")?;
        let prefix = self
            .run_capture(&["rev-parse", "--show-prefix"])
            .context("find working directory inside Git work tree")?
            .trim_end_matches('\n')
            .to_string();
        debug!(toplevel = %toplevel, prefix = %prefix, "resolved work tree");
        Ok(WorkTree {
            git: self.clone(),
            toplevel: PathBuf::from(toplevel),
            prefix,
        })
    }

    fn command(&self, args: &[&str]) -> ToolCommand {
        ToolCommand::new(&self.executable, args.iter().copied(), &self.workdir)
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        self.command(args).output_checked()
    }

    /// True if `git` exits zero; any output is discarded.
    fn succeeds(&self, args: &[&str]) -> Result<bool> {
        Ok(self.command(args).output()?.status.success())
    }
}

/// A Git work tree, entered from some directory inside it.
///
/// Commands run in the directory the [`Git`] handle was created for, so
/// subtree-scoped operations (`-- .`) are relative to that directory rather
/// than to [`WorkTree::toplevel`].
#[derive(Debug, Clone)]
pub struct WorkTree {
    git: Git,
    toplevel: PathBuf,
    prefix: String,
}

impl WorkTree {
    pub fn toplevel(&self) -> &Path {
        &self.toplevel
    }

    /// Working directory relative to [`WorkTree::toplevel`], with a trailing
    /// `/` (e.g. `live/`), or empty at the top level.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        self.status_entries(&["status", "--porcelain=v1", "-z", "-uall"])
    }

    fn status_entries(&self, args: &[&str]) -> Result<Vec<StatusEntry>> {
        let out = self.git.run_capture(args)?;
        parse_status_records(&out)
    }

    /// A clean work tree has no uncommitted, untracked or conflicting files.
    #[instrument(skip_all)]
    pub fn is_clean(&self) -> Result<bool> {
        let entries = self.status_porcelain()?;
        if !entries.is_empty() {
            debug!(entries = entries.len(), "work tree has changes");
        }
        Ok(entries.is_empty())
    }

    /// Short name of the upstream branch, e.g. `origin/main`.
    pub fn remote_branch_ref(&self) -> Result<String> {
        self.git
            .command(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"])
            .output_line()
            .context("unable to determine remote tracking branch")
    }

    /// Fetch, then compare `HEAD` with its upstream. Without an upstream the
    /// branch counts as not up to date.
    #[instrument(skip_all)]
    pub fn is_up_to_date(&self) -> Result<bool> {
        self.git
            .run_capture(&["fetch", "--quiet"])
            .context("unable to update remote branch references")?;

        let remote_branch_ref = match self.remote_branch_ref() {
            Ok(reference) => reference,
            Err(err) => {
                debug!(err = %format!("{err:#}"), "no upstream branch");
                return Ok(false);
            }
        };

        let ahead = self.count_commits("@{u}..HEAD").with_context(|| {
            format!("unable to count commits ahead of remote branch {remote_branch_ref}")
        })?;
        let behind = self.count_commits("HEAD..@{u}").with_context(|| {
            format!("unable to count commits behind remote branch {remote_branch_ref}")
        })?;
        debug!(ahead, behind, remote_branch_ref = %remote_branch_ref, "compared with upstream");
        Ok(ahead == 0 && behind == 0)
    }

    fn count_commits(&self, range: &str) -> Result<u64> {
        let out = self
            .git
            .command(&["rev-list", "--count", range])
            .output_line()?;
        out.parse::<u64>()
            .with_context(|| format!("parse commit count '{out}'"))
    }

    /// Files under the working directory that differ from `base_ref`.
    ///
    /// An empty or missing `base_ref` means the remote's default branch.
    #[instrument(skip_all, fields(base_ref = base_ref.unwrap_or(""), ?source))]
    pub fn changed_files(&self, base_ref: Option<&str>, source: ChangeSource) -> Result<ChangeSet> {
        let base_ref = match base_ref.filter(|reference| !reference.is_empty()) {
            Some(reference) => reference.to_string(),
            None => self.default_remote_branch_ref()?,
        };

        let diff = self.git.run_capture(&[
            "diff",
            "--no-renames",
            "--name-status",
            "-z",
            &base_ref,
            "HEAD",
            "--",
            ".",
        ])?;
        let committed = parse_name_status_nul(&diff)
            .with_context(|| format!("classify changes against {base_ref}"))?;
        debug!(count = committed.len(), base_ref = %base_ref, "committed changes");

        match source {
            ChangeSource::Committed => Ok(committed),
            ChangeSource::CommittedAndWorkingCopy => {
                let working: ChangeSet = self
                    .status_entries(&[
                        "status",
                        "--porcelain=v1",
                        "-z",
                        "-uall",
                        "--",
                        ".",
                    ])?
                    .into_iter()
                    .map(|entry| {
                        let kind = kind_for_status_code(&entry.code);
                        (entry.path, kind)
                    })
                    .collect();
                debug!(count = working.len(), "working copy changes");
                Ok(committed.merged_with(working))
            }
        }
    }

    /// `<remote>/HEAD`, discovering it from the remote first if it is not
    /// known locally (e.g. the remote was added after cloning).
    fn default_remote_branch_ref(&self) -> Result<String> {
        let remote = self.git.remote();
        let reference = format!("{remote}/HEAD");
        let full = format!("refs/remotes/{reference}");
        if self
            .git
            .succeeds(&["rev-parse", "--verify", "--quiet", &full])?
        {
            return Ok(reference);
        }

        warn!(reference = %reference, "remote HEAD unknown locally, discovering it");
        self.git
            .run_capture(&["remote", "set-head", remote, "-a"])
            .with_context(|| format!("discover default branch of remote {remote}"))?;
        info!(reference = %reference, "set remote HEAD");
        Ok(reference)
    }
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Each entry is `XY <path>` terminated by NUL; renames and copies carry an
/// extra NUL-terminated field with the original path, which is skipped.
fn parse_status_records(out: &str) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut records = out.split('\0').filter(|record| !record.is_empty());
    while let Some(record) = records.next() {
        let entry = parse_status_record(record)?;
        if entry.code.contains(['R', 'C']) {
            records.next();
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_status_record(record: &str) -> Result<StatusEntry> {
    match (record.get(..2), record.get(2..3), record.get(3..)) {
        (Some(code), Some(" "), Some(path)) if !path.is_empty() => Ok(StatusEntry {
            code: code.to_string(),
            path: path.to_string(),
        }),
        _ => Err(anyhow!("unexpected porcelain entry: '{record}'")),
    }
}
