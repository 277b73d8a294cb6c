//! Orchestration for `terrahoot plan` / `terrahoot apply`.
//!
//! The workflow state is discovered entirely from the surrounding platform.
//! Starting from [`WorkflowState::Unknown`], transitions run until one of them
//! yields no next state, yields the current state again, or fails. Only the
//! CI branch ([`WorkflowState::Remote`]) goes on to run Terragrunt; on a
//! workstation every path ends with a diagnostic telling the operator to push
//! or sync instead of applying directly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::env::Environment;
use crate::core::planner::{SelectionPlan, plan};
use crate::core::platform::Detector;
use crate::core::state::{LocalStatus, Upstream, WorkflowState, classify_local};
use crate::core::types::Phase;
use crate::io::config::TerrahootConfig;
use crate::io::invoker::{InvokeRequest, Invoker};
use crate::platform::Platform;

/// State machine over [`WorkflowState`] for a single invocation.
pub struct Workflow<'a> {
    workdir: PathBuf,
    env: &'a Environment,
    config: &'a TerrahootConfig,
    detector: Detector,
    state: WorkflowState,
    platform: Option<Platform>,
    visited: Vec<&'static str>,
}

impl<'a> Workflow<'a> {
    pub fn new(workdir: &Path, env: &'a Environment, config: &'a TerrahootConfig) -> Self {
        Self::with_detector(workdir, env, config, Detector::default())
    }

    pub fn with_detector(
        workdir: &Path,
        env: &'a Environment,
        config: &'a TerrahootConfig,
        detector: Detector,
    ) -> Self {
        let state = WorkflowState::Unknown;
        Self {
            workdir: workdir.to_path_buf(),
            env,
            config,
            detector,
            visited: vec![state.label()],
            state,
            platform: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn platform(&self) -> Option<&Platform> {
        self.platform.as_ref()
    }

    /// Labels of every state entered so far, starting with `Unknown`.
    pub fn visited(&self) -> &[&'static str] {
        &self.visited
    }

    /// Run transitions until the workflow halts.
    ///
    /// On success the workflow has halted in a state that allows execution.
    #[instrument(skip_all)]
    pub fn discover(&mut self) -> Result<()> {
        loop {
            let next = self.transition()?;
            let Some(next) = next else {
                debug!(state = self.state.label(), "workflow halted");
                return Ok(());
            };
            if next == self.state {
                debug!(state = self.state.label(), "workflow settled");
                return Ok(());
            }
            debug!(from = self.state.label(), to = next.label(), "state transition");
            self.visited.push(next.label());
            self.state = next;
        }
    }

    fn transition(&mut self) -> Result<Option<WorkflowState>> {
        if let Some(err) = self.state.terminal_error() {
            return Err(err);
        }
        match self.state {
            WorkflowState::Unknown => {
                let platform = Platform::detect(&self.detector, self.env, &self.workdir).context(
                    "unable to determine whether the workflow is running in CI or locally",
                )?;
                let next = WorkflowState::for_platform(platform.kind());
                self.platform = Some(platform);
                Ok(Some(next))
            }
            WorkflowState::Local => {
                let status = self.probe_local()?;
                classify_local(status).map(Some)
            }
            WorkflowState::Remote => Ok(None),
            _ => Err(anyhow!(
                "no transition defined for workflow state {}",
                self.state.label()
            )),
        }
    }

    fn probe_local(&self) -> Result<LocalStatus> {
        let platform = self.require_platform()?;
        let tree = platform
            .work_tree(self.config)
            .context("failed to find Git work tree")?;

        let dirty = !tree
            .is_clean()
            .context("failed to determine whether Git work tree is clean")?;
        if dirty {
            return Ok(LocalStatus {
                dirty,
                upstream: None,
            });
        }

        let remote_branch_ref = tree
            .remote_branch_ref()
            .context("failed to determine the remote Git branch reference")?;
        let up_to_date = tree
            .is_up_to_date()
            .context("failed to determine whether remote Git branch is up-to-date")?;
        Ok(LocalStatus {
            dirty,
            upstream: Some(Upstream {
                remote_branch_ref,
                up_to_date,
            }),
        })
    }

    fn require_platform(&self) -> Result<&Platform> {
        self.platform
            .as_ref()
            .ok_or_else(|| anyhow!("platform has not been detected yet"))
    }
}

/// Result of a workflow run that reached Terragrunt.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Labels of the states entered, starting with `Unknown`.
    pub visited: Vec<&'static str>,
    pub plan: SelectionPlan,
    /// Terragrunt's exit code.
    pub exit_code: i32,
}

/// Discover the workflow state and, if allowed, run `phase` over the units
/// affected by the change set.
#[instrument(skip_all, fields(phase = %phase))]
pub fn run_workflow<I: Invoker>(
    workdir: &Path,
    env: &Environment,
    config: &TerrahootConfig,
    phase: Phase,
    invoker: &I,
) -> Result<RunOutcome> {
    let mut workflow = Workflow::new(workdir, env, config);
    workflow.discover()?;

    let platform = workflow.require_platform()?.clone();
    if *workflow.state() != WorkflowState::Remote {
        return Err(anyhow!(
            "workflow halted in state {} which does not allow execution",
            workflow.state().label()
        ));
    }

    let (plan, exit_code) = execute(&platform, env, config, phase, invoker)?;
    Ok(RunOutcome {
        visited: workflow.visited().to_vec(),
        plan,
        exit_code,
    })
}

/// Classify changes, plan the unit selection and invoke Terragrunt.
fn execute<I: Invoker>(
    platform: &Platform,
    env: &Environment,
    config: &TerrahootConfig,
    phase: Phase,
    invoker: &I,
) -> Result<(SelectionPlan, i32)> {
    let tree = platform.work_tree(config)?;
    let clean = tree
        .is_clean()
        .context("cannot determine whether git working copy is clean")?;
    if !clean {
        return Err(anyhow!(
            "git working copy appears to be dirty; make sure it is clean"
        ));
    }

    let base_ref = env.base_ref().or(config.base_ref.as_deref());
    let changes = tree.changed_files(base_ref, config.change_source())?;
    let selection = plan(&changes, &config.unit_file);
    info!(
        changed = changes.len(),
        updated = selection.updated_files.len(),
        deleted_units = selection.deleted_units.len(),
        "planned unit selection"
    );
    for unit in &selection.deleted_units {
        info!(unit = unit.dir(), "unit file deleted; excluded from {phase}");
    }
    if selection.has_possible_unit_renames() {
        warn!("unit files were both deleted and added; a moved unit shows up as a delete plus an add");
    }

    let request = InvokeRequest {
        workdir: platform.workdir().to_path_buf(),
        phase,
        directives: selection.directives_relative_to(tree.prefix()),
        interactive: !platform.is_ci(),
        json_out_dir: config.json_out_dir.clone(),
    };
    let exit_code = invoker.invoke(&request)?;
    Ok((selection, exit_code))
}
