//! Toolchain environment inspection.
//!
//! Reads `ARCH` and `CROSS_COMPILE` once per invocation. When neither is set
//! the board's `setenv.sh` is run through a [`SetupHook`]; when either already
//! names the arm64 cross toolchain the run is refused.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::{ARCH_VAR, CROSS_COMPILE_VAR, RESERVED_ARCH, RESERVED_CROSS_COMPILE};
use crate::report::{Event, Reporter};
use crate::runner::CommandRunner;

/// Source of environment variables.
pub trait EnvSource {
  fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
  fn var(&self, name: &str) -> Option<String> {
    std::env::var(name).ok()
  }
}

impl<F> EnvSource for F
where
  F: Fn(&str) -> Option<String>,
{
  fn var(&self, name: &str) -> Option<String> {
    self(name)
  }
}

/// The toolchain selectors as seen at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSnapshot {
  pub arch: String,
  pub cross_compile: String,
}

impl EnvironmentSnapshot {
  /// Read both selectors. Unset and empty are the same thing; surrounding
  /// whitespace is ignored.
  pub fn read(env: &impl EnvSource) -> Self {
    let get = |name: &str| env.var(name).map(|v| v.trim().to_string()).unwrap_or_default();
    Self {
      arch: get(ARCH_VAR),
      cross_compile: get(CROSS_COMPILE_VAR),
    }
  }

  pub fn needs_setup(&self) -> bool {
    self.arch.is_empty() && self.cross_compile.is_empty()
  }

  /// Refuse to run when a cross toolchain is already selected.
  ///
  /// This mirrors the board scripts literally: the check fires exactly when
  /// the environment looks ready for cross-compiling.
  pub fn check(&self) -> Result<(), ToolchainConflict> {
    if self.arch == RESERVED_ARCH || self.cross_compile == RESERVED_CROSS_COMPILE {
      return Err(ToolchainConflict {
        arch: self.arch.clone(),
        cross_compile: self.cross_compile.clone(),
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cross toolchain already configured (ARCH={arch:?}, CROSS_COMPILE={cross_compile:?})")]
pub struct ToolchainConflict {
  pub arch: String,
  pub cross_compile: String,
}

/// One-shot environment preparation run when no toolchain is selected.
pub trait SetupHook {
  fn run_setup(&self) -> impl Future<Output = ()>;
}

/// Marks a setup script executable and sources it in a child shell.
#[derive(Debug)]
pub struct ScriptSetup<'a, R> {
  script: PathBuf,
  runner: &'a R,
}

impl<'a, R: CommandRunner> ScriptSetup<'a, R> {
  pub fn new(script: impl Into<PathBuf>, runner: &'a R) -> Self {
    Self {
      script: script.into(),
      runner,
    }
  }

  pub fn script(&self) -> &Path {
    &self.script
  }
}

impl<R: CommandRunner> SetupHook for ScriptSetup<'_, R> {
  async fn run_setup(&self) {
    if !self.script.is_file() {
      warn!(script = %self.script.display(), "setup script not found, continuing without it");
      return;
    }

    if let Err(e) = make_executable(&self.script) {
      warn!(script = %self.script.display(), error = %e, "failed to mark setup script executable");
    }

    let command = format!(". {}", shell_quote(&sourceable_path(&self.script)));
    match self.runner.run(&command, None).await {
      Ok(status) if status.success() => debug!(script = %self.script.display(), "setup script sourced"),
      Ok(status) => warn!(script = %self.script.display(), code = ?status.code, "setup script failed"),
      Err(e) => warn!(script = %self.script.display(), error = %e, "failed to run setup script"),
    }
  }
}

/// Read the toolchain selectors, run setup if neither is set, and refuse
/// a pre-configured cross toolchain.
pub async fn inspect(
  env: &impl EnvSource,
  setup: &impl SetupHook,
  reporter: &impl Reporter,
) -> Result<EnvironmentSnapshot, ToolchainConflict> {
  let snapshot = EnvironmentSnapshot::read(env);
  reporter.report(Event::Environment(&snapshot));

  if snapshot.needs_setup() {
    debug!("no toolchain selected, running setup");
    setup.run_setup().await;
  } else {
    snapshot.check()?;
  }

  Ok(snapshot)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mut perms = std::fs::metadata(path)?.permissions();
  perms.set_mode(perms.mode() | 0o111);
  std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
  Ok(())
}

/// `.` searches `PATH` for bare names, so relative scripts need a `./` prefix.
fn sourceable_path(path: &Path) -> String {
  let s = path.to_string_lossy();
  if path.is_absolute() || s.starts_with("./") || s.starts_with("../") {
    s.into_owned()
  } else {
    format!("./{s}")
  }
}

fn shell_quote(s: &str) -> String {
  format!("'{}'", s.replace('\'', r"'\''"))
}
