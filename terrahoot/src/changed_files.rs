//! `terrahoot changed-files`: list the classified change set.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::changes::ChangeSet;
use crate::core::env::Environment;
use crate::io::config::TerrahootConfig;

/// Classify changes under `workdir`.
///
/// The base ref is taken from `base_ref`, then `GIT_BASE_REF`, then the
/// config file; if none is set the remote's default branch is used.
pub fn changed_files(
    workdir: &Path,
    env: &Environment,
    config: &TerrahootConfig,
    base_ref: Option<&str>,
) -> Result<ChangeSet> {
    let tree = config.git(workdir).work_tree()?;
    let base_ref = base_ref
        .filter(|reference| !reference.is_empty())
        .or(env.base_ref())
        .or(config.base_ref.as_deref());
    tree.changed_files(base_ref, config.change_source())
}

/// One `<letter>\t<path>` line per change, in path order.
pub fn render_text(changes: &ChangeSet) -> String {
    let mut out = String::new();
    for (path, kind) in changes.iter() {
        out.push(kind.letter());
        out.push('\t');
        out.push_str(path);
        out.push('\n');
    }
    out
}

/// Pretty-printed JSON object mapping paths to kinds, with trailing newline.
pub fn render_json(changes: &ChangeSet) -> Result<String> {
    let mut payload = serde_json::to_string_pretty(changes).context("serialize change set")?;
    payload.push('\n');
    Ok(payload)
}
