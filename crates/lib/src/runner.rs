//! Shell command execution.
//!
//! Each step is handed to a [`CommandRunner`] as a single shell command line.
//! [`ShellRunner`] runs it through `/bin/sh -c`, and when a log file is
//! requested merges stderr into stdout and copies every chunk of output both
//! to the console and to the log, the way `cmd 2>&1 | tee build.log` would,
//! except that the command's own exit status is reported rather than tee's.
//!
//! Failed commands are reported once; nothing is retried.

use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use serde::Serialize;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

/// Exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandStatus {
  /// `None` when the process was killed by a signal.
  pub code: Option<i32>,
}

impl CommandStatus {
  pub const SUCCESS: CommandStatus = CommandStatus { code: Some(0) };

  pub fn from_code(code: i32) -> Self {
    Self { code: Some(code) }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

impl From<ExitStatus> for CommandStatus {
  fn from(status: ExitStatus) -> Self {
    Self { code: status.code() }
  }
}

/// Where a step's output is copied, and whether the file starts empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSink {
  pub path: PathBuf,
  pub truncate: bool,
}

impl LogSink {
  pub fn truncate(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      truncate: true,
    }
  }

  pub fn append(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      truncate: false,
    }
  }
}

/// Errors that keep a command from running to completion.
///
/// A command that runs and exits non-zero is not an error; see [`CommandStatus`].
#[derive(Debug, Error)]
pub enum RunnerError {
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to open log file {}: {source}", path.display())]
  OpenLog {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to copy output of `{cmd}`: {source}")]
  Output {
    cmd: String,
    #[source]
    source: std::io::Error,
  },
}

/// Runs one command line and reports how it exited.
pub trait CommandRunner {
  fn run(&self, command: &str, log: Option<&LogSink>) -> impl Future<Output = Result<CommandStatus, RunnerError>>;
}

/// Which console stream receives a command's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Echo {
  #[default]
  Stdout,
  Stderr,
}

/// Runs commands through the system shell, inheriting the caller's environment.
#[derive(Debug, Clone)]
pub struct ShellRunner {
  shell: String,
  shell_args: Vec<String>,
  echo: Echo,
}

impl Default for ShellRunner {
  fn default() -> Self {
    let (shell, shell_args) = get_shell(None);
    Self {
      shell,
      shell_args,
      echo: Echo::Stdout,
    }
  }
}

impl ShellRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_shell(mut self, shell: &str) -> Self {
    let (shell, shell_args) = get_shell(Some(shell));
    self.shell = shell;
    self.shell_args = shell_args;
    self
  }

  pub fn with_echo(mut self, echo: Echo) -> Self {
    self.echo = echo;
    self
  }

  fn command(&self, script: &str) -> Command {
    let mut command = Command::new(&self.shell);
    command.args(&self.shell_args).arg(script).stdin(Stdio::inherit());
    command
  }

  async fn run_inherited(&self, cmd: &str) -> Result<CommandStatus, RunnerError> {
    let status = self
      .command(cmd)
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .status()
      .await
      .map_err(|source| RunnerError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;
    Ok(status.into())
  }

  async fn run_captured(&self, cmd: &str, log: Option<&LogSink>) -> Result<CommandStatus, RunnerError> {
    let mut log_file = match log {
      Some(sink) => Some(open_log(sink).await?),
      None => None,
    };

    // `exec 2>&1` applies to the whole script, including compound commands.
    let script = format!("exec 2>&1\n{cmd}");
    let mut child = self
      .command(&script)
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
      .map_err(|source| RunnerError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;

    let output_err = |source: std::io::Error| RunnerError::Output {
      cmd: cmd.to_string(),
      source,
    };

    let mut copied = Ok(());
    if let Some(mut stdout) = child.stdout.take() {
      copied = match self.echo {
        Echo::Stdout => tee(&mut stdout, &mut tokio::io::stdout(), log_file.as_mut()).await,
        Echo::Stderr => tee(&mut stdout, &mut tokio::io::stderr(), log_file.as_mut()).await,
      };
      // `stdout` drops here, so a child still writing gets EPIPE rather than blocking the wait.
    }

    if let Some(file) = log_file.as_mut() {
      let flushed = file.flush().await;
      copied = copied.and(flushed);
    }

    let status = child.wait().await.map_err(output_err)?;
    copied.map_err(output_err)?;
    Ok(status.into())
  }
}

impl CommandRunner for ShellRunner {
  async fn run(&self, command: &str, log: Option<&LogSink>) -> Result<CommandStatus, RunnerError> {
    info!(cmd = %command, log = ?log.map(|l| &l.path), "executing command");

    let status = if log.is_none() && self.echo == Echo::Stdout {
      self.run_inherited(command).await?
    } else {
      self.run_captured(command, log).await?
    };

    debug!(cmd = %command, code = ?status.code, "command finished");
    Ok(status)
  }
}

/// Reports every command as successful without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
  async fn run(&self, command: &str, _log: Option<&LogSink>) -> Result<CommandStatus, RunnerError> {
    info!(cmd = %command, "dry run, not executing");
    Ok(CommandStatus::SUCCESS)
  }
}

async fn open_log(sink: &LogSink) -> Result<File, RunnerError> {
  let mut options = OpenOptions::new();
  options.create(true);
  if sink.truncate {
    options.write(true).truncate(true);
  } else {
    options.append(true);
  }
  options.open(&sink.path).await.map_err(|source| RunnerError::OpenLog {
    path: sink.path.clone(),
    source,
  })
}

async fn tee<R, W>(reader: &mut R, console: &mut W, mut log: Option<&mut File>) -> std::io::Result<()>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut buf = [0u8; 8192];
  let mut echo = true;
  loop {
    let n = reader.read(&mut buf).await?;
    if n == 0 {
      break;
    }
    if echo && let Err(e) = write_chunk(console, &buf[..n]).await {
      // A closed console (e.g. `rkbuild Image | head`) must not cut the log short.
      debug!(error = %e, "console closed, output continues to the log only");
      echo = false;
    }
    if let Some(file) = log.as_deref_mut() {
      file.write_all(&buf[..n]).await?;
    }
  }
  Ok(())
}

async fn write_chunk<W: AsyncWrite + Unpin>(console: &mut W, chunk: &[u8]) -> std::io::Result<()> {
  console.write_all(chunk).await?;
  console.flush().await
}

/// Get the shell command and argument list.
///
/// Steps are written for a POSIX shell, so `/bin/sh` is used unless a shell
/// is named explicitly.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  match override_shell {
    Some(shell) => (shell.to_string(), vec!["-c".to_string()]),
    None => ("/bin/sh".to_string(), vec!["-c".to_string()]),
  }
}
