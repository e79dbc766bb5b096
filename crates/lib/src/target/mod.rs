//! Build target definitions.
//!
//! A [`BuildTarget`] is a named, ordered list of [`Step`]s plus the artifacts
//! copied to the deploy directory once the steps have run. Targets are static
//! tables; everything that varies per invocation is a template placeholder
//! resolved against a [`BuildContext`].

pub mod registry;

use std::path::Path;

use serde::Serialize;

use crate::template::{Placeholder, Resolver, TemplateError};

pub use registry::{Profile, Registry};

/// What a failed step means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
  /// Reported only. The exit code is unaffected.
  Warn,
  /// The run fails, but the remaining steps still execute.
  Fail,
  /// The run fails and the remaining steps are skipped.
  Abort,
}

impl OnFailure {
  pub fn is_fatal(self) -> bool {
    !matches!(self, OnFailure::Warn)
  }
}

/// One external command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
  /// Shell command template, see [`crate::template`].
  pub command: &'static str,
  /// Log file (relative to the working directory) that receives a copy of the output.
  pub log: Option<&'static str>,
  pub on_failure: OnFailure,
  /// Phase name framed by start/end banners, e.g. "Build Image".
  pub banner: Option<&'static str>,
  pub success_note: Option<&'static str>,
  pub failure_note: Option<&'static str>,
}

impl Step {
  pub const fn new(command: &'static str) -> Self {
    Self {
      command,
      log: None,
      on_failure: OnFailure::Fail,
      banner: None,
      success_note: None,
      failure_note: None,
    }
  }

  pub const fn log(self, log: &'static str) -> Self {
    Self { log: Some(log), ..self }
  }

  pub const fn on_failure(self, on_failure: OnFailure) -> Self {
    Self { on_failure, ..self }
  }

  pub const fn banner(self, banner: &'static str) -> Self {
    Self {
      banner: Some(banner),
      ..self
    }
  }

  pub const fn success_note(self, note: &'static str) -> Self {
    Self {
      success_note: Some(note),
      ..self
    }
  }

  pub const fn failure_note(self, note: &'static str) -> Self {
    Self {
      failure_note: Some(note),
      ..self
    }
  }
}

/// A file copied into a directory after the target's steps have run.
///
/// Both fields are templates. The copy keeps the source file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactCopy {
  pub source: &'static str,
  pub destination: &'static str,
}

impl ArtifactCopy {
  pub const fn new(source: &'static str, destination: &'static str) -> Self {
    Self { source, destination }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTarget {
  /// Command token, matched exactly.
  pub name: &'static str,
  /// One-line description shown in usage help.
  pub about: &'static str,
  pub steps: &'static [Step],
  pub artifacts: &'static [ArtifactCopy],
  /// Printed when every step succeeded.
  pub success_note: Option<&'static str>,
}

/// Values that command and artifact templates resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
  make: String,
  out_dir: String,
  jobs: String,
  deploy_dir: Option<String>,
  modules_root: Option<String>,
}

impl BuildContext {
  pub fn new(make: impl Into<String>, out_dir: &Path, jobs: usize) -> Self {
    Self {
      make: make.into(),
      out_dir: out_dir.to_string_lossy().into_owned(),
      jobs: jobs.to_string(),
      deploy_dir: None,
      modules_root: None,
    }
  }

  pub fn with_deploy_dir(mut self, dir: Option<&Path>) -> Self {
    self.deploy_dir = dir.map(|d| d.to_string_lossy().into_owned());
    self
  }

  pub fn with_modules_root(mut self, dir: Option<&Path>) -> Self {
    self.modules_root = dir.map(|d| d.to_string_lossy().into_owned());
    self
  }
}

impl Resolver for BuildContext {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, TemplateError> {
    let value = match placeholder {
      Placeholder::Make => Some(self.make.as_str()),
      Placeholder::Out => Some(self.out_dir.as_str()),
      Placeholder::Jobs => Some(self.jobs.as_str()),
      Placeholder::Deploy => self.deploy_dir.as_deref(),
      Placeholder::ModulesRoot => self.modules_root.as_deref(),
    };
    value.ok_or(TemplateError::Unresolved(placeholder))
  }
}
