//! Structured status events.
//!
//! The dispatcher never prints. It emits [`Event`]s to an injected
//! [`Reporter`]; the CLI renders them as coloured banners, tests record them.

use std::path::Path;

use crate::deploy::DeployEntry;
use crate::dispatch::StepOutcome;
use crate::env::EnvironmentSnapshot;
use crate::target::OnFailure;

#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
  /// Toolchain selectors read at startup.
  Environment(&'a EnvironmentSnapshot),
  PhaseStarted(&'a str),
  PhaseFinished(&'a str),
  StepStarted {
    command: &'a str,
    log: Option<&'a Path>,
  },
  StepFinished {
    command: &'a str,
    outcome: &'a StepOutcome,
    on_failure: OnFailure,
  },
  /// An earlier step aborted the target.
  StepSkipped {
    command: &'a str,
  },
  Note {
    text: &'a str,
    success: bool,
  },
  Deployed(&'a DeployEntry),
  TargetFinished {
    target: &'a str,
    success: bool,
  },
}

pub trait Reporter {
  fn report(&self, event: Event<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
  fn report(&self, _event: Event<'_>) {}
}

impl<R: Reporter + ?Sized> Reporter for &R {
  fn report(&self, event: Event<'_>) {
    (**self).report(event);
  }
}
