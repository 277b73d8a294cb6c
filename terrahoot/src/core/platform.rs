//! Platform detection from an environment snapshot.
//!
//! Candidates are tried in the order they were given to the [`Detector`]; the
//! first one whose predicate matches wins.

use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::core::env::Environment;

/// Where the workflow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// A human's workstation.
    Local,
    /// A recognized CI system.
    Ci,
}

impl PlatformKind {
    pub fn is_ci(self) -> bool {
        matches!(self, PlatformKind::Ci)
    }
}

/// A platform kind plus the predicate that selects it.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub kind: PlatformKind,
    pub matches: fn(&Environment) -> bool,
}

impl Candidate {
    /// `CI=true`.
    pub fn ci() -> Self {
        Self {
            kind: PlatformKind::Ci,
            matches: Environment::is_ci,
        }
    }

    /// Anything that is not `CI=true`.
    pub fn local() -> Self {
        Self {
            kind: PlatformKind::Local,
            matches: |env| !env.is_ci(),
        }
    }
}

/// Ordered list of platform candidates.
#[derive(Debug, Clone)]
pub struct Detector {
    candidates: Vec<Candidate>,
}

impl Detector {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn detect(&self, env: &Environment) -> Result<PlatformKind> {
        self.candidates
            .iter()
            .find(|candidate| (candidate.matches)(env))
            .map(|candidate| candidate.kind)
            .ok_or_else(|| anyhow!("no supported platform detected from environment"))
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(vec![Candidate::ci(), Candidate::local()])
    }
}
