//! terrahoot configuration stored under `.terrahoot/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::planner::DEFAULT_UNIT_FILE;
use crate::io::git::{ChangeSource, DEFAULT_GIT_EXECUTABLE, DEFAULT_REMOTE, Git};

/// Config file location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".terrahoot/config.toml";
/// Where Terragrunt writes its JSON plan output.
pub const DEFAULT_JSON_OUT_DIR: &str = ".terrahoot/output";
pub const DEFAULT_TERRAGRUNT_EXECUTABLE: &str = "terragrunt";

/// terrahoot configuration (TOML).
///
/// Every field is optional in the file; missing fields fall back to the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TerrahootConfig {
    /// Remote whose default branch is the base for change detection.
    pub remote: String,

    /// File name that marks a directory as a Terragrunt unit.
    pub unit_file: String,

    /// Base reference used when `GIT_BASE_REF` is not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_ref: Option<String>,

    /// Passed to `terragrunt --json-out-dir`.
    pub json_out_dir: PathBuf,

    /// Also treat uncommitted and untracked files as changed.
    pub include_working_copy: bool,

    pub git: GitConfig,

    pub terragrunt: TerragruntConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    pub executable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TerragruntConfig {
    pub executable: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_GIT_EXECUTABLE.to_string(),
        }
    }
}

impl Default for TerragruntConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_TERRAGRUNT_EXECUTABLE.to_string(),
        }
    }
}

impl Default for TerrahootConfig {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            unit_file: DEFAULT_UNIT_FILE.to_string(),
            base_ref: None,
            json_out_dir: PathBuf::from(DEFAULT_JSON_OUT_DIR),
            include_working_copy: false,
            git: GitConfig::default(),
            terragrunt: TerragruntConfig::default(),
        }
    }
}

impl TerrahootConfig {
    pub fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(anyhow!("remote must be non-empty"));
        }
        if self.unit_file.trim().is_empty() {
            return Err(anyhow!("unit_file must be non-empty"));
        }
        if self.unit_file.contains('/') || self.unit_file.contains('\\') {
            return Err(anyhow!(
                "unit_file must be a bare file name, got '{}'",
                self.unit_file
            ));
        }
        if self.json_out_dir.as_os_str().is_empty() {
            return Err(anyhow!("json_out_dir must be non-empty"));
        }
        if self.git.executable.trim().is_empty() {
            return Err(anyhow!("git.executable must be non-empty"));
        }
        if self.terragrunt.executable.trim().is_empty() {
            return Err(anyhow!("terragrunt.executable must be non-empty"));
        }
        Ok(())
    }

    pub fn change_source(&self) -> ChangeSource {
        if self.include_working_copy {
            ChangeSource::CommittedAndWorkingCopy
        } else {
            ChangeSource::Committed
        }
    }

    /// Git handle for `workdir` using the configured executable and remote.
    pub fn git(&self, workdir: &Path) -> Git {
        Git::with_settings(workdir, &self.git.executable, &self.remote)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TerrahootConfig::default()`.
pub fn load_config(path: &Path) -> Result<TerrahootConfig> {
    if !path.exists() {
        let cfg = TerrahootConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TerrahootConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
