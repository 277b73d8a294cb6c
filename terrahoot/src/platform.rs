//! The platform the workflow runs on and its capabilities.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::env::Environment;
use crate::core::platform::{Detector, PlatformKind};
use crate::io::config::TerrahootConfig;
use crate::io::git::WorkTree;

/// A detected platform bound to the directory the workflow was started in.
///
/// Local and CI platforms currently resolve the same work tree; the difference
/// only matters to later workflow steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    kind: PlatformKind,
    workdir: PathBuf,
}

impl Platform {
    pub fn new(kind: PlatformKind, workdir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            workdir: workdir.into(),
        }
    }

    /// Detect the platform from `env`.
    pub fn detect(detector: &Detector, env: &Environment, workdir: &Path) -> Result<Self> {
        let kind = detector.detect(env)?;
        Ok(Self::new(kind, workdir))
    }

    pub fn kind(&self) -> PlatformKind {
        self.kind
    }

    pub fn is_ci(&self) -> bool {
        self.kind.is_ci()
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Git work tree of the infrastructure repository.
    pub fn work_tree(&self, config: &TerrahootConfig) -> Result<WorkTree> {
        config.git(&self.workdir).work_tree()
    }
}
