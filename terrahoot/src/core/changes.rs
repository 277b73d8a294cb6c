//! Classification of changed paths reported by git.
//!
//! Parsing is kept free of I/O so the same rules apply to live `git` output and
//! to test fixtures.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a path differs from the base reference.
///
/// Renames are not modeled. With rename detection disabled they show up as a
/// deleted old path plus an added new path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

impl ChangeKind {
    /// Status letter as printed by `git diff --name-status`.
    pub fn letter(self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Deleted => 'D',
            ChangeKind::Modified => 'M',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Repository-relative paths mapped to their change kind, in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, ChangeKind>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<ChangeKind> {
        self.0.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        self.0.iter().map(|(path, kind)| (path.as_str(), *kind))
    }

    /// Overlay `other` on top of `self`; entries from `other` win.
    pub fn merged_with(mut self, other: ChangeSet) -> ChangeSet {
        self.0.extend(other.0);
        self
    }
}

impl FromIterator<(String, ChangeKind)> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = (String, ChangeKind)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, ChangeKind);
    type IntoIter = btree_map::IntoIter<String, ChangeKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

static NAME_STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S.*?)\s*$").unwrap());

/// Parse `git diff --name-status` output.
///
/// Blank lines and lines without a path are skipped. Any status other than
/// `A`, `D` or `M` is an error; copies, type changes and unmerged entries are
/// never dropped silently.
pub fn parse_name_status(output: &str) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();
    for line in output.lines() {
        let Some(caps) = NAME_STATUS_RE.captures(line) else {
            continue;
        };
        let kind = kind_for_letter(&caps[1], line)?;
        changes.0.insert(caps[2].to_string(), kind);
    }
    Ok(changes)
}

/// Parse `git diff --name-status -z` output.
///
/// Status and path are separate NUL-terminated fields and paths are printed
/// verbatim, so names with non-ASCII bytes, tabs or quotes survive intact.
pub fn parse_name_status_nul(output: &str) -> Result<ChangeSet> {
    let mut changes = ChangeSet::new();
    let mut fields = output.split('\0').filter(|field| !field.is_empty());
    while let Some(status) = fields.next() {
        let Some(path) = fields.next() else {
            return Err(anyhow!(
                "missing path after status {status:?} in \"git diff --name-status -z\" output"
            ));
        };
        let kind = kind_for_letter(status, path)?;
        changes.0.insert(path.to_string(), kind);
    }
    Ok(changes)
}

fn kind_for_letter(status: &str, context: &str) -> Result<ChangeKind> {
    match status {
        "A" => Ok(ChangeKind::Added),
        "D" => Ok(ChangeKind::Deleted),
        "M" => Ok(ChangeKind::Modified),
        other => Err(anyhow!(
            "unhandled status letter in \"git diff --name-status\" output: {other} (entry: '{context}')"
        )),
    }
}

/// Map a two-letter porcelain status code onto a change kind.
pub fn kind_for_status_code(code: &str) -> ChangeKind {
    if code == "??" || code.contains('A') || code.contains('R') {
        ChangeKind::Added
    } else if code.contains('D') {
        ChangeKind::Deleted
    } else {
        ChangeKind::Modified
    }
}
