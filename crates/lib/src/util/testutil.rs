//! Test doubles for the runner, reporter, and setup seams.

use std::cell::{Cell, RefCell};

use crate::deploy::DeployOutcome;
use crate::dispatch::StepOutcome;
use crate::env::SetupHook;
use crate::report::{Event, Reporter};
use crate::runner::{CommandRunner, CommandStatus, LogSink, RunnerError};

/// Records every command instead of running it.
///
/// Commands containing one of the `failing` patterns exit with status 2.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  calls: RefCell<Vec<(String, Option<LogSink>)>>,
  failing: Vec<String>,
}

impl RecordingRunner {
  pub fn failing(patterns: &[&str]) -> Self {
    Self {
      calls: RefCell::default(),
      failing: patterns.iter().map(|p| p.to_string()).collect(),
    }
  }

  pub fn calls(&self) -> Vec<(String, Option<LogSink>)> {
    self.calls.borrow().clone()
  }

  pub fn commands(&self) -> Vec<String> {
    self.calls.borrow().iter().map(|(cmd, _)| cmd.clone()).collect()
  }
}

impl CommandRunner for RecordingRunner {
  async fn run(&self, command: &str, log: Option<&LogSink>) -> Result<CommandStatus, RunnerError> {
    self.calls.borrow_mut().push((command.to_string(), log.cloned()));
    if self.failing.iter().any(|p| command.contains(p.as_str())) {
      Ok(CommandStatus::from_code(2))
    } else {
      Ok(CommandStatus::SUCCESS)
    }
  }
}

/// Flattens events into short strings for order assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
  events: RefCell<Vec<String>>,
}

impl RecordingReporter {
  pub fn events(&self) -> Vec<String> {
    self.events.borrow().clone()
  }
}

impl Reporter for RecordingReporter {
  fn report(&self, event: Event<'_>) {
    let line = match event {
      Event::Environment(env) => format!("env ARCH={} CROSS_COMPILE={}", env.arch, env.cross_compile),
      Event::PhaseStarted(name) => format!("start {name}"),
      Event::PhaseFinished(name) => format!("end {name}"),
      Event::StepStarted { command, .. } => format!("run {command}"),
      Event::StepFinished { command, outcome, .. } => match outcome {
        StepOutcome::Succeeded => format!("ok {command}"),
        StepOutcome::Failed { code, .. } => format!("fail {command} {code:?}"),
        StepOutcome::Skipped => format!("skip {command}"),
      },
      Event::StepSkipped { command } => format!("skip {command}"),
      Event::Note { text, .. } => format!("note {text}"),
      Event::Deployed(entry) => {
        let status = match entry.outcome {
          DeployOutcome::Copied { .. } => "copied",
          DeployOutcome::Planned => "planned",
          DeployOutcome::SkippedMissingDestination => "skipped_missing_destination",
          DeployOutcome::Failed { .. } => "failed",
        };
        format!("deploy {} {status}", entry.file_name())
      }
      Event::TargetFinished { target, success } => format!("done {target} {success}"),
    };
    self.events.borrow_mut().push(line);
  }
}

/// Counts setup invocations.
#[derive(Debug, Default)]
pub struct CountingSetup {
  count: Cell<usize>,
}

impl CountingSetup {
  pub fn count(&self) -> usize {
    self.count.get()
  }
}

impl SetupHook for CountingSetup {
  async fn run_setup(&self) {
    self.count.set(self.count.get() + 1);
  }
}
