//! Copying build artifacts into the network-boot directory.
//!
//! Deployment is best-effort: a missing destination directory is an expected
//! state (the TFTP export is not mounted on every machine) and is reported as
//! a skip, never created. Copy failures are reported and the remaining
//! artifacts are still attempted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::target::ArtifactCopy;
use crate::template::{Resolver, substitute};

/// What happened to one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeployOutcome {
  Copied { bytes: u64 },
  /// Dry run: the destination exists and the copy would have happened.
  Planned,
  SkippedMissingDestination,
  Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployEntry {
  pub source: String,
  pub destination: String,
  #[serde(flatten)]
  pub outcome: DeployOutcome,
}

impl DeployEntry {
  /// File name of the artifact, for messages.
  pub fn file_name(&self) -> &str {
    Path::new(&self.source)
      .file_name()
      .and_then(|n| n.to_str())
      .unwrap_or(&self.source)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
  pub entries: Vec<DeployEntry>,
}

impl DeployReport {
  pub fn copied(&self) -> usize {
    self.count(|o| matches!(o, DeployOutcome::Copied { .. }))
  }

  pub fn skipped(&self) -> usize {
    self.count(|o| matches!(o, DeployOutcome::SkippedMissingDestination))
  }

  pub fn failed(&self) -> usize {
    self.count(|o| matches!(o, DeployOutcome::Failed { .. }))
  }

  fn count(&self, f: impl Fn(&DeployOutcome) -> bool) -> usize {
    self.entries.iter().filter(|e| f(&e.outcome)).count()
  }
}

/// Copy each artifact into its destination directory.
///
/// Templates are resolved against `resolver`. With `dry_run` set nothing is
/// written; present destinations are reported as [`DeployOutcome::Planned`].
pub fn deploy(copies: &[ArtifactCopy], resolver: &impl Resolver, dry_run: bool) -> DeployReport {
  let entries = copies.iter().map(|copy| deploy_one(copy, resolver, dry_run)).collect();
  DeployReport { entries }
}

fn deploy_one(copy: &ArtifactCopy, resolver: &impl Resolver, dry_run: bool) -> DeployEntry {
  let (source, destination) = match (substitute(copy.source, resolver), substitute(copy.destination, resolver)) {
    (Ok(s), Ok(d)) => (s, d),
    (s, d) => {
      let error = s.err().or(d.err()).map(|e| e.to_string()).unwrap_or_default();
      warn!(source = copy.source, destination = copy.destination, %error, "cannot resolve artifact paths");
      return DeployEntry {
        source: copy.source.to_string(),
        destination: copy.destination.to_string(),
        outcome: DeployOutcome::Failed { error },
      };
    }
  };

  let outcome = copy_into(Path::new(&source), Path::new(&destination), dry_run);
  DeployEntry {
    source,
    destination,
    outcome,
  }
}

fn copy_into(source: &Path, dest_dir: &Path, dry_run: bool) -> DeployOutcome {
  if !dest_dir.is_dir() {
    info!(destination = %dest_dir.display(), "destination missing, skipping copy");
    return DeployOutcome::SkippedMissingDestination;
  }

  let Some(file_name) = source.file_name() else {
    return DeployOutcome::Failed {
      error: format!("{} has no file name", source.display()),
    };
  };
  let target: PathBuf = dest_dir.join(file_name);

  if dry_run {
    return DeployOutcome::Planned;
  }

  match fs::copy(source, &target) {
    Ok(bytes) => {
      info!(source = %source.display(), target = %target.display(), bytes, "copied artifact");
      DeployOutcome::Copied { bytes }
    }
    Err(e) => {
      warn!(source = %source.display(), target = %target.display(), error = %e, "failed to copy artifact");
      DeployOutcome::Failed {
        error: format!("failed to copy {} -> {}: {e}", source.display(), target.display()),
      }
    }
  }
}
