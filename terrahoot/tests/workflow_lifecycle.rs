//! Workflow-level tests for complete terrahoot runs.
//!
//! These tests drive the state machine against real temporary Git
//! repositories (with a bare `origin` where needed) and a recording invoker,
//! verifying which state each scenario ends in and exactly what would be
//! passed to Terragrunt.

use terrahoot::core::env::Environment;
use terrahoot::core::planner::UnitRef;
use terrahoot::core::state::WorkflowState;
use terrahoot::core::types::Phase;
use terrahoot::io::config::TerrahootConfig;
use terrahoot::test_support::{RecordingInvoker, TestRepo};
use terrahoot::workflow::{Workflow, run_workflow};

/// Repository with two units and a shared input file, pushed to `origin`.
///
/// ```text
/// modules/app/terragrunt.hcl
/// modules/app/vars.tf
/// modules/old/terragrunt.hcl
/// ```
fn infra_repo() -> TestRepo {
    let mut repo = TestRepo::new().expect("repo");
    repo.write_file("modules/app/terragrunt.hcl", "inputs = {}\n")
        .expect("write");
    repo.write_file("modules/app/vars.tf", "variable \"name\" {}\n")
        .expect("write");
    repo.write_file("modules/old/terragrunt.hcl", "inputs = {}\n")
        .expect("write");
    repo.commit_all("add units").expect("commit");
    repo.add_remote().expect("remote");
    repo
}

fn ci_env(base_ref: Option<&str>) -> Environment {
    let mut pairs = vec!["CI=true".to_string()];
    if let Some(base_ref) = base_ref {
        pairs.push(format!("GIT_BASE_REF={base_ref}"));
    }
    Environment::from_pairs(pairs)
}

#[test]
fn ci_apply_selects_only_affected_units() {
    let repo = infra_repo();
    let base = repo.head().expect("head");
    repo.write_file("modules/app/terragrunt.hcl", "inputs = { a = 1 }\n")
        .expect("write");
    repo.write_file("modules/app/vars.tf", "variable \"renamed\" {}\n")
        .expect("write");
    repo.remove_file("modules/old/terragrunt.hcl").expect("rm");
    repo.commit_all("change units").expect("commit");

    let env = ci_env(Some(&base));
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let outcome =
        run_workflow(repo.path(), &env, &config, Phase::Apply, &invoker).expect("run");
    assert_eq!(outcome.visited, vec!["Unknown", "Remote"]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(
        outcome.plan.deleted_units,
        vec![UnitRef::from_unit_file("modules/old/terragrunt.hcl")]
    );

    let requests = invoker.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].args(),
        vec![
            "run",
            "--all",
            "--non-interactive",
            "--queue-strict-include",
            "--queue-include-dir",
            "modules/app",
            "--queue-include-units-reading",
            "modules/app/vars.tf",
            "--json-out-dir",
            ".terrahoot/output",
            "apply",
            "--",
            "-input=false",
            "-auto-approve",
        ]
    );
}

#[test]
fn ci_default_base_ref_is_remote_head() {
    let repo = infra_repo();
    repo.write_file("modules/new/terragrunt.hcl", "").expect("write");
    repo.commit_all("add unit").expect("commit");

    let env = ci_env(None);
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let outcome = run_workflow(repo.path(), &env, &config, Phase::Plan, &invoker).expect("run");
    assert_eq!(outcome.plan.updated_files, vec!["modules/new/terragrunt.hcl"]);
    let args = invoker.requests()[0].args();
    assert!(
        args.windows(2)
            .any(|pair| pair == ["--queue-include-dir", "modules/new"])
    );
}

#[test]
fn run_from_subdirectory_passes_paths_relative_to_it() {
    let repo = infra_repo();
    let base = repo.head().expect("head");
    repo.write_file("modules/app/vars.tf", "variable \"other\" {}\n")
        .expect("write");
    repo.write_file("modules/api/terragrunt.hcl", "").expect("write");
    repo.write_file("docs/notes.md", "").expect("write");
    repo.commit_all("change units").expect("commit");

    let workdir = repo.path().join("modules");
    let env = ci_env(Some(&base));
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let outcome = run_workflow(&workdir, &env, &config, Phase::Plan, &invoker).expect("run");
    assert_eq!(
        outcome.plan.updated_files,
        vec!["modules/api/terragrunt.hcl", "modules/app/vars.tf"]
    );

    let requests = invoker.requests();
    assert_eq!(requests[0].workdir, workdir);
    let args = requests[0].args();
    assert!(
        args.windows(2)
            .any(|pair| pair == ["--queue-include-dir", "api"])
    );
    assert!(
        args.windows(2)
            .any(|pair| pair == ["--queue-include-units-reading", "app/vars.tf"])
    );
    assert!(workdir.join("api").is_dir());
    assert!(workdir.join("app/vars.tf").is_file());
}

#[test]
fn non_ascii_unit_directories_are_selected_and_deleted_intact() {
    let repo = infra_repo();
    repo.write_file("modules/caf\u{e9}/terragrunt.hcl", "").expect("write");
    repo.commit_all("add unit").expect("commit");
    let base = repo.head().expect("head");
    repo.remove_file("modules/caf\u{e9}/terragrunt.hcl").expect("rm");
    repo.write_file("modules/\u{fc}ber/terragrunt.hcl", "").expect("write");
    repo.commit_all("replace unit").expect("commit");

    let env = ci_env(Some(&base));
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let outcome = run_workflow(repo.path(), &env, &config, Phase::Plan, &invoker).expect("run");
    assert_eq!(
        outcome.plan.deleted_units,
        vec![UnitRef::from_unit_file("modules/caf\u{e9}/terragrunt.hcl")]
    );
    let args = invoker.requests()[0].args();
    assert!(
        args.windows(2)
            .any(|pair| pair == ["--queue-include-dir", "modules/\u{fc}ber"])
    );
    assert!(!args.iter().any(|arg| arg.contains("caf")));
}

#[test]
fn terragrunt_exit_code_is_propagated() {
    let repo = infra_repo();
    let base = repo.head().expect("head");
    let env = ci_env(Some(&base));
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(2);

    let outcome = run_workflow(repo.path(), &env, &config, Phase::Plan, &invoker).expect("run");
    assert_eq!(outcome.exit_code, 2);
}

#[test]
fn unsupported_status_letter_aborts_before_invoking() {
    let repo = infra_repo();
    let base = repo.head().expect("head");
    // A file turning into a symlink is a type change ("T").
    repo.remove_file("modules/app/vars.tf").expect("rm");
    std::os::unix::fs::symlink("terragrunt.hcl", repo.path().join("modules/app/vars.tf"))
        .expect("symlink");
    repo.commit_all("type change").expect("commit");

    let env = ci_env(Some(&base));
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let err = run_workflow(repo.path(), &env, &config, Phase::Plan, &invoker)
        .expect_err("type change");
    assert!(format!("{err:#}").contains("unhandled status letter"));
    assert!(invoker.requests().is_empty());
}

#[test]
fn local_uncommitted_never_invokes_terragrunt() {
    let repo = infra_repo();
    repo.write_file("modules/app/vars.tf", "variable \"wip\" {}\n")
        .expect("write");

    let env = Environment::default();
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let err = run_workflow(repo.path(), &env, &config, Phase::Apply, &invoker)
        .expect_err("uncommitted");
    assert!(err.to_string().contains("uncommitted changes"));
    assert!(invoker.requests().is_empty());
}

#[test]
fn local_pushed_reports_remote_branch() {
    let repo = infra_repo();
    let env = Environment::from_pairs(["CI=false"]);
    let config = TerrahootConfig::default();
    let mut workflow = Workflow::new(repo.path(), &env, &config);

    let err = workflow.discover().expect_err("pushed");
    assert!(err.to_string().contains("origin/main"));
    assert_eq!(
        *workflow.state(),
        WorkflowState::LocalPushed {
            remote_branch_ref: "origin/main".to_string()
        }
    );
    assert_eq!(workflow.visited(), &["Unknown", "Local", "LocalPushed"]);
}

#[test]
fn local_commit_ahead_of_remote_is_out_of_sync() {
    let repo = infra_repo();
    repo.write_file("modules/app/vars.tf", "variable \"next\" {}\n")
        .expect("write");
    repo.commit_all("unpushed").expect("commit");

    let env = Environment::default();
    let config = TerrahootConfig::default();
    let invoker = RecordingInvoker::new(0);

    let err = run_workflow(repo.path(), &env, &config, Phase::Plan, &invoker)
        .expect_err("out of sync");
    assert!(
        err.to_string()
            .contains("out of sync with remote tracking branch \"origin/main\"")
    );
    assert!(invoker.requests().is_empty());
}

#[test]
fn local_pushed_after_push_is_in_sync_again() {
    let repo = infra_repo();
    repo.write_file("modules/app/vars.tf", "variable \"next\" {}\n")
        .expect("write");
    repo.commit_all("unpushed").expect("commit");
    repo.push().expect("push");

    let env = Environment::default();
    let config = TerrahootConfig::default();
    let mut workflow = Workflow::new(repo.path(), &env, &config);
    assert!(workflow.discover().is_err());
    assert_eq!(workflow.state().label(), "LocalPushed");
}

#[test]
fn every_scenario_terminates_within_three_states() {
    let clean = infra_repo();
    let dirty = infra_repo();
    dirty.write_file("scratch.tf", "").expect("write");
    let base = clean.head().expect("head");
    let config = TerrahootConfig::default();

    let cases = [
        (&clean, Environment::default(), Err("LocalPushed")),
        (&dirty, Environment::default(), Err("LocalUncommitted")),
        (&clean, ci_env(Some(&base)), Ok("Remote")),
        (&dirty, ci_env(Some(&base)), Ok("Remote")),
    ];
    for (repo, env, expected) in &cases {
        let mut workflow = Workflow::new(repo.path(), env, &config);
        let result = workflow.discover();
        let label = workflow.state().label();
        match expected {
            Ok(final_state) => {
                assert!(result.is_ok(), "{label}: {result:?}");
                assert_eq!(label, *final_state);
            }
            Err(final_state) => {
                assert!(result.is_err(), "{label} should halt with an error");
                assert_eq!(label, *final_state);
            }
        }
        assert!(
            workflow.visited().len() <= 3,
            "visited {:?}",
            workflow.visited()
        );
    }
}
