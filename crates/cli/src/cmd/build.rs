//! Implementation of the `rkbuild <command>` invocation.
//!
//! Wires the process environment, the shell runner and the console renderer
//! into a [`Dispatcher`] and maps its outcome onto an exit code.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use rkbuild_lib::dispatch::{DispatchError, Dispatcher, RunReport};
use rkbuild_lib::env::{ProcessEnv, ScriptSetup};
use rkbuild_lib::platform::paths;
use rkbuild_lib::runner::{CommandRunner, DryRunRunner, Echo, ShellRunner};
use rkbuild_lib::target::{BuildContext, Profile, Registry};

use crate::output::{ConsoleReporter, OutputFormat, format_duration, print_error, print_json};

/// Everything the command line decides about one run.
#[derive(Debug)]
pub struct BuildOptions {
  pub args: Vec<String>,
  pub profile: Profile,
  pub make: String,
  pub jobs: usize,
  pub out_dir: PathBuf,
  pub deploy_dir: Option<PathBuf>,
  pub modules_root: Option<PathBuf>,
  pub setup_script: PathBuf,
  pub dry_run: bool,
  pub format: OutputFormat,
}

/// Execute one build invocation and return the process exit code.
///
/// Usage, unknown-command and toolchain errors are printed here and become
/// exit code 1. Only failures of the CLI itself are returned as errors.
pub fn cmd_build(options: BuildOptions, usage: &str) -> Result<i32> {
  let registry = Registry::for_profile(options.profile);

  let deploy_dir = options.deploy_dir.clone().or_else(paths::deploy_dir);
  let modules_root = options.modules_root.clone().or_else(paths::modules_root);
  let context = BuildContext::new(&options.make, &options.out_dir, options.jobs)
    .with_deploy_dir(deploy_dir.as_deref())
    .with_modules_root(modules_root.as_deref());

  debug!(
    profile = %options.profile,
    deploy_dir = ?deploy_dir,
    modules_root = ?modules_root,
    "build context ready"
  );

  let reporter = ConsoleReporter::new(options.format);

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let start = Instant::now();
  let result = if options.dry_run {
    rt.block_on(run(&options, &registry, &context, &DryRunRunner, &reporter))
  } else {
    let echo = if options.format.is_json() { Echo::Stderr } else { Echo::Stdout };
    let runner = ShellRunner::new().with_echo(echo);
    rt.block_on(run(&options, &registry, &context, &runner, &reporter))
  };

  let report = match result {
    Ok(report) => report,
    Err(DispatchError::Usage(count)) => {
      debug!(count, "wrong number of arguments");
      eprint!("{usage}");
      return Ok(1);
    }
    Err(e) => {
      print_error(&e.to_string());
      return Ok(1);
    }
  };

  if options.format.is_json() {
    print_json(&report)?;
  } else {
    println!("Elapsed: {}", format_duration(start.elapsed()));
  }

  Ok(report.exit_code())
}

async fn run<R: CommandRunner>(
  options: &BuildOptions,
  registry: &Registry,
  context: &BuildContext,
  runner: &R,
  reporter: &ConsoleReporter,
) -> Result<RunReport, DispatchError> {
  let setup = ScriptSetup::new(&options.setup_script, runner);
  Dispatcher::new(registry, context, runner, reporter)
    .with_dry_run(options.dry_run)
    .dispatch(&options.args, &ProcessEnv, &setup)
    .await
}
