//! Unit selection: map a change set onto Terragrunt queue filters.

use std::path::Path;

use serde::Serialize;

use crate::core::changes::{ChangeKind, ChangeSet};

/// File name that marks a directory as a Terragrunt unit.
pub const DEFAULT_UNIT_FILE: &str = "terragrunt.hcl";

/// A Terragrunt unit, identified by the directory holding its unit file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UnitRef(String);

impl UnitRef {
    /// Unit owning `unit_file_path`. A unit file at the top level maps to `.`.
    pub fn from_unit_file(unit_file_path: &str) -> Self {
        let dir = Path::new(unit_file_path)
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .filter(|parent| !parent.is_empty())
            .unwrap_or_else(|| ".".to_string());
        Self(dir)
    }

    pub fn dir(&self) -> &str {
        &self.0
    }
}

/// One queue filter passed to `terragrunt run --all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeDirective {
    /// Include this unit directly.
    Unit(UnitRef),
    /// Include every unit that reads this file.
    UnitsReading(String),
}

impl IncludeDirective {
    pub fn to_args(&self) -> [String; 2] {
        match self {
            IncludeDirective::Unit(unit) => {
                ["--queue-include-dir".to_string(), unit.dir().to_string()]
            }
            IncludeDirective::UnitsReading(path) => [
                "--queue-include-units-reading".to_string(),
                path.to_string(),
            ],
        }
    }

    /// Re-root a repository-relative directive onto the subdirectory `prefix`
    /// (as printed by `git rev-parse --show-prefix`, e.g. `live/`).
    pub fn relative_to(&self, prefix: &str) -> IncludeDirective {
        match self {
            IncludeDirective::Unit(unit) => {
                IncludeDirective::Unit(UnitRef(strip_dir_prefix(unit.dir(), prefix)))
            }
            IncludeDirective::UnitsReading(path) => {
                IncludeDirective::UnitsReading(strip_dir_prefix(path, prefix))
            }
        }
    }
}

/// `path` relative to the directory `prefix`; `.` when they are equal. Paths
/// outside `prefix` are returned unchanged.
fn strip_dir_prefix(path: &str, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() || prefix == "." {
        return path.to_string();
    }
    if path == prefix {
        return ".".to_string();
    }
    match path
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        Some(rest) => rest.to_string(),
        None => path.to_string(),
    }
}

/// Result of planning a change set.
///
/// `deleted_units` holds directories, `updated_files` holds file paths; a
/// deleted unit file never appears in `updated_files`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionPlan {
    /// Units whose unit file was deleted. Candidates for a destroy before the
    /// main phase; never included in it.
    pub deleted_units: Vec<UnitRef>,
    /// Every other changed path, in change-set order.
    pub updated_files: Vec<String>,
    #[serde(skip)]
    unit_file: String,
    #[serde(skip)]
    added_unit_files: usize,
}

impl SelectionPlan {
    /// Queue filters for the main phase.
    pub fn directives(&self) -> Vec<IncludeDirective> {
        self.updated_files
            .iter()
            .map(|path| {
                if is_unit_file(path, &self.unit_file) {
                    IncludeDirective::Unit(UnitRef::from_unit_file(path))
                } else {
                    IncludeDirective::UnitsReading(path.clone())
                }
            })
            .collect()
    }

    /// [`SelectionPlan::directives`] with paths relative to the subdirectory
    /// `prefix` Terragrunt runs from.
    pub fn directives_relative_to(&self, prefix: &str) -> Vec<IncludeDirective> {
        self.directives()
            .iter()
            .map(|directive| directive.relative_to(prefix))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.deleted_units.is_empty() && self.updated_files.is_empty()
    }

    /// True when unit files were both deleted and added. Without rename
    /// detection a moved unit looks exactly like this.
    pub fn has_possible_unit_renames(&self) -> bool {
        !self.deleted_units.is_empty() && self.added_unit_files > 0
    }
}

/// Whether `path` names a unit file (base name match only).
pub fn is_unit_file(path: &str, unit_file: &str) -> bool {
    Path::new(path)
        .file_name()
        .is_some_and(|name| name == unit_file)
}

/// Build the selection plan for `changes`.
pub fn plan(changes: &ChangeSet, unit_file: &str) -> SelectionPlan {
    let mut selection = SelectionPlan {
        unit_file: unit_file.to_string(),
        ..SelectionPlan::default()
    };

    for (path, kind) in changes.iter() {
        let unit_scoped = is_unit_file(path, unit_file);
        match (unit_scoped, kind) {
            (true, ChangeKind::Deleted) => {
                selection
                    .deleted_units
                    .push(UnitRef::from_unit_file(path));
            }
            (true, ChangeKind::Added) => {
                selection.added_unit_files += 1;
                selection.updated_files.push(path.to_string());
            }
            _ => selection.updated_files.push(path.to_string()),
        }
    }

    selection
}
