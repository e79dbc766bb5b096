//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// The temporary directory doubles as the kernel source tree: build output,
/// logs, the deploy directory and the modules root all live under it.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn deploy_dir(&self) -> PathBuf {
    self.path("tftpboot")
  }

  /// Create the deploy directory so artifacts get copied.
  pub fn with_deploy_dir(self) -> Self {
    std::fs::create_dir_all(self.deploy_dir()).unwrap();
    self
  }

  /// Get a Command configured for this test environment.
  ///
  /// `ARCH` is set to a harmless value so the setup script is not sourced;
  /// tests that exercise setup override it.
  pub fn rkbuild_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("rkbuild");
    cmd
      .current_dir(self.root())
      .env("ARCH", "riscv")
      .env_remove("CROSS_COMPILE")
      .env_remove("RUST_LOG")
      .env("HOME", self.root())
      .env("RKBUILD_DEPLOY_DIR", self.deploy_dir())
      .env("RKBUILD_MODULES_ROOT", self.path("rootfs"));
    cmd
  }
}
