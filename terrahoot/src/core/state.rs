//! Workflow states and the pure parts of their transitions.
//!
//! Transitions that need the platform or the Git work tree live in
//! [`crate::workflow`]; everything decidable from plain values lives here.

use anyhow::{Error, Result, anyhow};

use crate::core::platform::PlatformKind;

/// Workflow state discovered from the surrounding platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Nothing inspected yet.
    Unknown,
    /// Running on a workstation outside any known CI system.
    Local,
    /// Running in CI, which owns the infrastructure state.
    Remote,
    /// The work tree has uncommitted changes.
    LocalUncommitted,
    /// Committed and pushed; nothing to do locally.
    LocalPushed { remote_branch_ref: String },
    /// Committed, but out of sync with the remote tracking branch.
    LocalCommitted { remote_branch_ref: String },
    // Reserved for the review workflow.
    InDraft,
    ReadyForReview,
    Reviewed,
    Approved,
    Merged,
    Applied,
}

impl WorkflowState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Unknown => "Unknown",
            WorkflowState::Local => "Local",
            WorkflowState::Remote => "Remote",
            WorkflowState::LocalUncommitted => "LocalUncommitted",
            WorkflowState::LocalPushed { .. } => "LocalPushed",
            WorkflowState::LocalCommitted { .. } => "LocalCommitted",
            WorkflowState::InDraft => "InDraft",
            WorkflowState::ReadyForReview => "ReadyForReview",
            WorkflowState::Reviewed => "Reviewed",
            WorkflowState::Approved => "Approved",
            WorkflowState::Merged => "Merged",
            WorkflowState::Applied => "Applied",
        }
    }

    /// State entered once the platform is known.
    pub fn for_platform(kind: PlatformKind) -> Self {
        if kind.is_ci() {
            WorkflowState::Remote
        } else {
            WorkflowState::Local
        }
    }

    /// Diagnostic for states that end the workflow with an error.
    ///
    /// Returns `None` for states that either transition further or end the
    /// workflow successfully.
    pub fn terminal_error(&self) -> Option<Error> {
        match self {
            WorkflowState::LocalUncommitted => {
                Some(anyhow!("local Git work tree has uncommitted changes"))
            }
            WorkflowState::LocalPushed { remote_branch_ref } => Some(anyhow!(
                "local Git work tree has no uncommitted changes, and is pushed to remote branch {remote_branch_ref}; nothing to do locally"
            )),
            WorkflowState::LocalCommitted { remote_branch_ref } => Some(anyhow!(
                "local Git branch is out of sync with remote tracking branch \"{remote_branch_ref}\""
            )),
            WorkflowState::InDraft
            | WorkflowState::ReadyForReview
            | WorkflowState::Reviewed
            | WorkflowState::Approved
            | WorkflowState::Merged
            | WorkflowState::Applied => Some(anyhow!(
                "workflow state {} is not implemented",
                self.label()
            )),
            WorkflowState::Unknown | WorkflowState::Local | WorkflowState::Remote => None,
        }
    }
}

/// Upstream tracking branch of a local work tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote_branch_ref: String,
    pub up_to_date: bool,
}

/// Facts gathered about a local work tree. `upstream` is only probed for a
/// clean work tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStatus {
    pub dirty: bool,
    pub upstream: Option<Upstream>,
}

/// Next state for a local work tree.
pub fn classify_local(status: LocalStatus) -> Result<WorkflowState> {
    if status.dirty {
        return Ok(WorkflowState::LocalUncommitted);
    }
    let upstream = status
        .upstream
        .ok_or_else(|| anyhow!("failed to determine the remote Git branch reference"))?;
    if upstream.up_to_date {
        Ok(WorkflowState::LocalPushed {
            remote_branch_ref: upstream.remote_branch_ref,
        })
    } else {
        Ok(WorkflowState::LocalCommitted {
            remote_branch_ref: upstream.remote_branch_ref,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(dirty: bool, up_to_date: bool) -> LocalStatus {
        LocalStatus {
            dirty,
            upstream: Some(Upstream {
                remote_branch_ref: "origin/main".to_string(),
                up_to_date,
            }),
        }
    }

    #[test]
    fn dirty_wins_over_sync_state() {
        for up_to_date in [true, false] {
            assert_eq!(
                classify_local(status(true, up_to_date)).expect("classify"),
                WorkflowState::LocalUncommitted
            );
        }
        let no_upstream = LocalStatus {
            dirty: true,
            upstream: None,
        };
        assert_eq!(
            classify_local(no_upstream).expect("classify"),
            WorkflowState::LocalUncommitted
        );
    }

    #[test]
    fn clean_and_in_sync_is_pushed() {
        assert_eq!(
            classify_local(status(false, true)).expect("classify"),
            WorkflowState::LocalPushed {
                remote_branch_ref: "origin/main".to_string()
            }
        );
    }

    #[test]
    fn clean_and_diverged_is_committed() {
        assert_eq!(
            classify_local(status(false, false)).expect("classify"),
            WorkflowState::LocalCommitted {
                remote_branch_ref: "origin/main".to_string()
            }
        );
    }

    #[test]
    fn clean_without_upstream_is_an_error() {
        let err = classify_local(LocalStatus {
            dirty: false,
            upstream: None,
        })
        .expect_err("no upstream");
        assert!(err.to_string().contains("remote Git branch reference"));
    }

    #[test]
    fn platform_selects_entry_state() {
        assert_eq!(
            WorkflowState::for_platform(PlatformKind::Ci),
            WorkflowState::Remote
        );
        assert_eq!(
            WorkflowState::for_platform(PlatformKind::Local),
            WorkflowState::Local
        );
    }

    #[test]
    fn terminal_errors_name_the_remote_branch() {
        let err = WorkflowState::LocalCommitted {
            remote_branch_ref: "origin/feature".to_string(),
        }
        .terminal_error()
        .expect("error");
        assert!(err.to_string().contains("\"origin/feature\""));

        let err = WorkflowState::LocalPushed {
            remote_branch_ref: "origin/feature".to_string(),
        }
        .terminal_error()
        .expect("error");
        assert!(err.to_string().contains("origin/feature"));
    }

    #[test]
    fn reserved_states_are_not_implemented() {
        for state in [
            WorkflowState::InDraft,
            WorkflowState::ReadyForReview,
            WorkflowState::Reviewed,
            WorkflowState::Approved,
            WorkflowState::Merged,
            WorkflowState::Applied,
        ] {
            let err = state.terminal_error().expect("error");
            assert!(err.to_string().contains("not implemented"));
        }
    }

    #[test]
    fn non_terminal_states_have_no_error() {
        assert!(WorkflowState::Unknown.terminal_error().is_none());
        assert!(WorkflowState::Local.terminal_error().is_none());
        assert!(WorkflowState::Remote.terminal_error().is_none());
    }
}
