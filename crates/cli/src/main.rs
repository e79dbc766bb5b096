mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use rkbuild_lib::consts::{APP_NAME, DEFAULT_JOBS, DEFAULT_MAKE, DEFAULT_OUT_DIR, DEFAULT_SETUP_SCRIPT};
use rkbuild_lib::target::{Profile, Registry};

use crate::cmd::BuildOptions;
use crate::output::OutputFormat;

/// rkbuild - kernel build orchestration for the ROC-RK3399-PC board
#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(author, version, about, long_about = None)]
#[command(after_help = target_list())]
struct Cli {
  /// Build target to run
  #[arg(value_name = "COMMAND")]
  command: Vec<String>,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Target table to dispatch against
  #[arg(long, value_enum, default_value_t = ProfileArg::Board)]
  profile: ProfileArg,

  /// Build tool invoked by every step
  #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_MAKE)]
  make: String,

  /// Parallel jobs passed to the build tool
  #[arg(short, long, default_value_t = DEFAULT_JOBS, value_parser = clap::value_parser!(u16).range(1..))]
  jobs: u16,

  /// Kernel build output directory
  #[arg(long, value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
  out_dir: PathBuf,

  /// Directory artifacts are copied to [default: $RKBUILD_DEPLOY_DIR or ~/tftpboot]
  #[arg(long, value_name = "DIR")]
  deploy_dir: Option<PathBuf>,

  /// Root filesystem modules are installed into [default: $RKBUILD_MODULES_ROOT or ~/nfs_rootfs/rootfs]
  #[arg(long, value_name = "DIR")]
  modules_root: Option<PathBuf>,

  /// Script sourced when neither ARCH nor CROSS_COMPILE is set
  #[arg(long, value_name = "FILE", default_value = DEFAULT_SETUP_SCRIPT)]
  setup_script: PathBuf,

  /// Print the steps without running them
  #[arg(long)]
  dry_run: bool,

  /// Output format
  #[arg(short, long, value_enum, default_value_t)]
  output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
  Board,
  InTree,
}

impl From<ProfileArg> for Profile {
  fn from(arg: ProfileArg) -> Self {
    match arg {
      ProfileArg::Board => Profile::Board,
      ProfileArg::InTree => Profile::InTree,
    }
  }
}

fn target_list() -> String {
  let mut text = String::new();
  for profile in [Profile::Board, Profile::InTree] {
    text.push_str(&format!("Targets ({profile}):\n"));
    for target in Registry::for_profile(profile).targets() {
      text.push_str(&format!("  {:<14}{}\n", target.name, target.about));
    }
  }
  text
}

fn main() -> Result<()> {
  // Every usage error exits with 1, not clap's default of 2.
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
    Err(e) => {
      e.print().context("Failed to print usage")?;
      std::process::exit(1);
    }
  };

  let filter = if cli.verbose {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let usage = Cli::command().render_help().to_string();

  let options = BuildOptions {
    args: cli.command,
    profile: cli.profile.into(),
    make: cli.make,
    jobs: usize::from(cli.jobs),
    out_dir: cli.out_dir,
    deploy_dir: cli.deploy_dir,
    modules_root: cli.modules_root,
    setup_script: cli.setup_script,
    dry_run: cli.dry_run,
    format: cli.output,
  };

  let code = cmd::cmd_build(options, &usage)?;
  std::process::exit(code);
}
