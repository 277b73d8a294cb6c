//! Shared deterministic types for terrahoot core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;
use std::str::FromStr;

use anyhow::{Error, anyhow};
use serde::{Deserialize, Serialize};

/// Terragrunt command run across the selected units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Plan,
    Apply,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::Apply => "apply",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;

    /// Only the exact lowercase names are accepted.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "plan" => Ok(Phase::Plan),
            "apply" => Ok(Phase::Apply),
            other => Err(anyhow!("unsupported Terragrunt command: {other}")),
        }
    }
}
