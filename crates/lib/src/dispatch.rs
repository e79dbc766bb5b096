//! Command dispatch.
//!
//! A run moves through `AWAITING_COMMAND -> RUNNING -> {DONE, FAILED}`:
//!
//! - anything but exactly one argument fails with [`DispatchError::Usage`]
//!   before the environment is looked at;
//! - the environment is inspected (a pre-configured cross toolchain fails
//!   the run);
//! - the token is resolved against the [`Registry`];
//! - the target's steps run in order, then its artifacts are deployed.
//!
//! Step failures never stop the dispatcher from reaching `DONE`; they are
//! recorded in the [`RunReport`], whose exit code reflects whether a fatal
//! step failed.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::deploy::{DeployReport, deploy};
use crate::env::{EnvSource, SetupHook, ToolchainConflict, inspect};
use crate::report::{Event, Reporter};
use crate::runner::{CommandRunner, LogSink};
use crate::target::{BuildContext, BuildTarget, OnFailure, Registry, Step};
use crate::template::substitute;

/// Errors that end a run before any step executes.
#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("expected exactly one command, got {0} arguments")]
  Usage(usize),

  #[error("Unknown command name {0}")]
  UnknownCommand(String),

  #[error(transparent)]
  ToolchainConflict(#[from] ToolchainConflict),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
  Succeeded,
  Failed {
    code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
  },
  Skipped,
}

impl StepOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(self, StepOutcome::Failed { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
  pub command: String,
  pub log: Option<PathBuf>,
  pub on_failure: OnFailure,
  #[serde(flatten)]
  pub outcome: StepOutcome,
}

/// Result of running one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub target: String,
  pub dry_run: bool,
  pub steps: Vec<StepRecord>,
  pub deploy: DeployReport,
  /// Index of the first step whose failure is fatal.
  pub first_failure: Option<usize>,
}

impl RunReport {
  pub fn success(&self) -> bool {
    self.first_failure.is_none()
  }

  pub fn exit_code(&self) -> i32 {
    if self.success() { 0 } else { 1 }
  }
}

/// Drives one invocation from command token to [`RunReport`].
pub struct Dispatcher<'a, R, P> {
  registry: &'a Registry,
  context: &'a BuildContext,
  runner: &'a R,
  reporter: &'a P,
  log_dir: PathBuf,
  dry_run: bool,
}

impl<'a, R: CommandRunner, P: Reporter> Dispatcher<'a, R, P> {
  pub fn new(registry: &'a Registry, context: &'a BuildContext, runner: &'a R, reporter: &'a P) -> Self {
    Self {
      registry,
      context,
      runner,
      reporter,
      log_dir: PathBuf::new(),
      dry_run: false,
    }
  }

  /// Directory that step log files are written to. Defaults to the working directory.
  pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.log_dir = dir.into();
    self
  }

  pub fn with_dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  /// Validate the arguments, inspect the environment, and run the named target.
  ///
  /// # Errors
  ///
  /// Returns an error for wrong arity, a refused toolchain, or an unknown
  /// command. Step failures are reported in the returned [`RunReport`].
  pub async fn dispatch(
    &self,
    args: &[String],
    env: &impl EnvSource,
    setup: &impl SetupHook,
  ) -> Result<RunReport, DispatchError> {
    let [command] = args else {
      return Err(DispatchError::Usage(args.len()));
    };

    inspect(env, setup, self.reporter).await?;

    let target = self.registry.resolve(command).ok_or_else(|| {
      debug!(command = %command, "unknown command");
      DispatchError::UnknownCommand(command.clone())
    })?;

    Ok(self.run_target(target).await)
  }

  /// Run every step of `target` in order, then deploy its artifacts.
  pub async fn run_target(&self, target: &BuildTarget) -> RunReport {
    debug!(target = target.name, dry_run = self.dry_run, "running target");

    let mut steps = Vec::with_capacity(target.steps.len());
    let mut first_failure = None;
    let mut aborted = false;
    let mut opened_logs = HashSet::new();

    for (index, step) in target.steps.iter().enumerate() {
      let command = substitute(step.command, self.context);
      let display = command.as_deref().unwrap_or(step.command).to_string();
      let log = step.log.map(|name| self.log_path(name));

      if aborted {
        self.reporter.report(Event::StepSkipped { command: &display });
        steps.push(StepRecord {
          command: display,
          log,
          on_failure: step.on_failure,
          outcome: StepOutcome::Skipped,
        });
        continue;
      }

      // The first use of a log file in this run truncates it.
      let sink = log.as_ref().map(|path| {
        if opened_logs.insert(path.clone()) {
          LogSink::truncate(path)
        } else {
          LogSink::append(path)
        }
      });

      let outcome = self.run_step(step, command, &display, sink.as_ref()).await;

      if outcome.is_failure() && step.on_failure.is_fatal() {
        if first_failure.is_none() {
          first_failure = Some(index);
        }
        if step.on_failure == OnFailure::Abort {
          aborted = true;
        }
      }

      steps.push(StepRecord {
        command: display,
        log,
        on_failure: step.on_failure,
        outcome,
      });
    }

    let deploy = deploy(target.artifacts, self.context, self.dry_run);
    for entry in &deploy.entries {
      self.reporter.report(Event::Deployed(entry));
    }

    let all_succeeded = steps.iter().all(|s| s.outcome == StepOutcome::Succeeded);
    if all_succeeded && let Some(text) = target.success_note {
      self.reporter.report(Event::Note { text, success: true });
    }

    self.reporter.report(Event::TargetFinished {
      target: target.name,
      success: first_failure.is_none(),
    });

    RunReport {
      target: target.name.to_string(),
      dry_run: self.dry_run,
      steps,
      deploy,
      first_failure,
    }
  }

  async fn run_step(
    &self,
    step: &Step,
    command: Result<String, crate::template::TemplateError>,
    display: &str,
    sink: Option<&LogSink>,
  ) -> StepOutcome {
    if let Some(banner) = step.banner {
      self.reporter.report(Event::PhaseStarted(banner));
    }

    self.reporter.report(Event::StepStarted {
      command: display,
      log: sink.map(|s| s.path.as_path()),
    });

    let outcome = match command {
      Ok(command) => match self.runner.run(&command, sink).await {
        Ok(status) if status.success() => StepOutcome::Succeeded,
        Ok(status) => StepOutcome::Failed {
          code: status.code,
          error: None,
        },
        Err(e) => {
          warn!(cmd = %command, error = %e, "command could not be run");
          StepOutcome::Failed {
            code: None,
            error: Some(e.to_string()),
          }
        }
      },
      Err(e) => {
        warn!(template = step.command, error = %e, "cannot render command");
        StepOutcome::Failed {
          code: None,
          error: Some(e.to_string()),
        }
      }
    };

    self.reporter.report(Event::StepFinished {
      command: display,
      outcome: &outcome,
      on_failure: step.on_failure,
    });

    let note = match &outcome {
      StepOutcome::Succeeded => step.success_note.map(|text| (text, true)),
      _ => step.failure_note.map(|text| (text, false)),
    };
    if let Some((text, success)) = note {
      self.reporter.report(Event::Note { text, success });
    }

    if let Some(banner) = step.banner {
      self.reporter.report(Event::PhaseFinished(banner));
    }

    outcome
  }

  fn log_path(&self, name: &str) -> PathBuf {
    self.log_dir.join(name)
  }
}
