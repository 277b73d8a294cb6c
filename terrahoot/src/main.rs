//! Opinionated wrapper for Terragrunt runs in CI/CD workflows.
//!
//! Runs `plan` or `apply` only in the Terragrunt units affected by the files
//! changed since a base reference, and only from CI. On a workstation the
//! workflow stops with a diagnostic instead of touching infrastructure.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use terrahoot::changed_files::{changed_files, render_json, render_text};
use terrahoot::core::env::Environment;
use terrahoot::core::types::Phase;
use terrahoot::exit_codes;
use terrahoot::io::config::{DEFAULT_CONFIG_PATH, load_config};
use terrahoot::io::invoker::TerragruntInvoker;
use terrahoot::logging;
use terrahoot::workflow::run_workflow;

#[derive(Parser)]
#[command(
    name = "terrahoot",
    version,
    about = "Opinionated wrapper for Terragrunt runs in CI/CD workflows"
)]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run "plan" in Terragrunt units affected by changed files.
    Plan,
    /// Run "apply" in Terragrunt units affected by changed files.
    Apply,
    /// Run a command in Terragrunt units affected by changed files.
    #[command(hide = true)]
    Run {
        /// Terragrunt command: "plan" or "apply".
        phase: String,
    },
    /// List files changed since the base revision.
    ChangedFiles {
        /// Base revision (defaults to GIT_BASE_REF, then the remote's HEAD).
        #[arg(long, value_name = "REF")]
        base_ref: Option<String>,
        /// Emit a JSON object instead of `<status>\t<path>` lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let env = Environment::from_process();
    logging::init(env.debug_enabled());

    match run(&env) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILURE);
        }
    }
}

fn run(env: &Environment) -> Result<i32> {
    let cli = Cli::parse();
    let workdir = std::env::current_dir().context("determine current directory")?;
    match cli.command {
        Command::Plan => cmd_run(&workdir, env, &cli.config, Phase::Plan),
        Command::Apply => cmd_run(&workdir, env, &cli.config, Phase::Apply),
        Command::Run { phase } => {
            let phase: Phase = phase.parse()?;
            cmd_run(&workdir, env, &cli.config, phase)
        }
        Command::ChangedFiles { base_ref, json } => {
            cmd_changed_files(&workdir, env, &cli.config, base_ref.as_deref(), json)
        }
    }
}

fn cmd_run(workdir: &Path, env: &Environment, config_path: &Path, phase: Phase) -> Result<i32> {
    let config = load_config(&workdir.join(config_path))?;
    let invoker = TerragruntInvoker::new(config.terragrunt.executable.clone());
    let outcome = run_workflow(workdir, env, &config, phase, &invoker)?;
    Ok(outcome.exit_code)
}

fn cmd_changed_files(
    workdir: &Path,
    env: &Environment,
    config_path: &Path,
    base_ref: Option<&str>,
    json: bool,
) -> Result<i32> {
    let config = load_config(&workdir.join(config_path))?;
    let changes = changed_files(workdir, env, &config, base_ref)?;
    let rendered = if json {
        render_json(&changes)?
    } else {
        render_text(&changes)
    };
    std::io::stdout()
        .write_all(rendered.as_bytes())
        .context("write changed files")?;
    Ok(exit_codes::OK)
}
