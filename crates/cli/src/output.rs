//! CLI output formatting.
//!
//! Renders the dispatcher's status events as coloured banners and status
//! lines, plus human-readable durations and JSON output.

use std::fmt::Display;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use rkbuild_lib::deploy::DeployOutcome;
use rkbuild_lib::dispatch::StepOutcome;
use rkbuild_lib::report::{Event, Reporter};
use rkbuild_lib::target::OnFailure;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIP: &str = "-";
}

const BANNER_RULE: &str = "===============";

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Renders dispatcher events to the terminal.
///
/// Text mode writes to stdout. In JSON mode stdout is reserved for the report,
/// so everything goes to stderr instead.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
  stream: Stream,
}

impl ConsoleReporter {
  pub fn new(format: OutputFormat) -> Self {
    let stream = if format.is_json() { Stream::Stderr } else { Stream::Stdout };
    Self { stream }
  }

  fn line(&self, text: impl Display) {
    match self.stream {
      Stream::Stderr => eprintln!("{text}"),
      _ => println!("{text}"),
    }
  }

  fn success(&self, message: &str) {
    self.line(format!(
      "{} {}",
      symbols::SUCCESS.if_supports_color(self.stream, |s| s.green()),
      message
    ));
  }

  fn failure(&self, message: &str) {
    self.line(format!(
      "{} {}",
      symbols::ERROR.if_supports_color(self.stream, |s| s.red()),
      message.if_supports_color(self.stream, |s| s.red())
    ));
  }

  fn warning(&self, message: &str) {
    self.line(format!(
      "{} {}",
      symbols::WARNING.if_supports_color(self.stream, |s| s.yellow()),
      message.if_supports_color(self.stream, |s| s.yellow())
    ));
  }

  fn info(&self, message: &str) {
    self.line(format!(
      "{} {}",
      symbols::INFO.if_supports_color(self.stream, |s| s.blue()),
      message
    ));
  }

  fn banner(&self, verb: &str, phase: &str) {
    let title = format!("{verb} {phase}");
    self.line(format!(
      "{BANNER_RULE}{}{BANNER_RULE}",
      title.if_supports_color(self.stream, |s| s.yellow().bold().to_string())
    ));
  }

  fn selector(&self, name: &str, value: &str) {
    self.line(format!(
      "Current {name} = {}",
      value.if_supports_color(self.stream, |s| s.green().bold().to_string())
    ));
  }
}

impl Reporter for ConsoleReporter {
  fn report(&self, event: Event<'_>) {
    match event {
      Event::Environment(env) => {
        self.selector("ARCH", &env.arch);
        self.selector("CROSS_COMPILE", &env.cross_compile);
      }
      Event::PhaseStarted(phase) => self.banner("Start", phase),
      Event::PhaseFinished(phase) => self.banner("End", phase),
      Event::StepStarted { command, log } => {
        let suffix = log.map(|p| format!("  (log: {})", p.display())).unwrap_or_default();
        self.line(format!(
          "{} {}{}",
          symbols::ARROW.if_supports_color(self.stream, |s| s.cyan()),
          command.if_supports_color(self.stream, |s| s.bold()),
          suffix.if_supports_color(self.stream, |s| s.dimmed())
        ));
      }
      Event::StepFinished {
        command,
        outcome,
        on_failure,
      } => match outcome {
        StepOutcome::Failed { code, error } => {
          let reason = match (code, error) {
            (_, Some(error)) => error.clone(),
            (Some(code), None) => format!("exit code {code}"),
            (None, None) => "terminated by signal".to_string(),
          };
          let message = format!("`{command}` failed: {reason}");
          if on_failure == OnFailure::Warn {
            self.warning(&message);
          } else {
            self.failure(&message);
          }
        }
        StepOutcome::Succeeded | StepOutcome::Skipped => {}
      },
      Event::StepSkipped { command } => self.line(format!(
        "{} skipped `{}`",
        symbols::SKIP.if_supports_color(self.stream, |s| s.dimmed()),
        command
      )),
      Event::Note { text, success } => {
        if success {
          self.success(text);
        } else {
          self.failure(text);
        }
      }
      Event::Deployed(entry) => match &entry.outcome {
        DeployOutcome::Copied { .. } => {
          self.success(&format!("copy {} to {} finish!", entry.file_name(), entry.destination))
        }
        DeployOutcome::Planned => self.info(&format!("would copy {} to {}", entry.file_name(), entry.destination)),
        DeployOutcome::SkippedMissingDestination => self.info(&format!(
          "{} not exist! {} not copied",
          entry.destination,
          entry.file_name()
        )),
        DeployOutcome::Failed { error } => self.warning(&format!("copy {} failed: {error}", entry.file_name())),
      },
      Event::TargetFinished { target, success } => {
        if success {
          self.success(&format!("{target} finished"));
        } else {
          self.failure(&format!("{target} failed"));
        }
      }
    }
  }
}
