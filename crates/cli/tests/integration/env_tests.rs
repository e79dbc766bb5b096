//! Toolchain environment integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn selectors_are_printed() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .args(["--make", "true", "clean"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Current ARCH = riscv"))
    .stdout(predicate::str::contains("Current CROSS_COMPILE = "));
}

#[test]
fn reserved_arch_is_refused() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .env("ARCH", "arm64")
    .args(["--make", "true", "clean"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("cross toolchain already configured"))
    .stdout(predicate::str::contains("Clean Finish").not());
}

#[test]
fn reserved_cross_compile_is_refused() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .env_remove("ARCH")
    .env("CROSS_COMPILE", "aarch64-linux-gnu-")
    .args(["--make", "true", "Image"])
    .assert()
    .code(1);

  assert!(!env.path("build_Image.log").exists());
}

#[test]
fn setup_script_runs_when_no_toolchain_selected() {
  let env = TestEnv::new();
  env.write_file("setenv.sh", "touch sourced\n");

  env
    .rkbuild_cmd()
    .env_remove("ARCH")
    .args(["--make", "true", "clean"])
    .assert()
    .success();

  assert!(env.path("sourced").exists());

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(env.path("setenv.sh")).unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0);
  }
}

#[test]
fn setup_script_is_skipped_when_toolchain_selected() {
  let env = TestEnv::new();
  env.write_file("setenv.sh", "touch sourced\n");

  env.rkbuild_cmd().args(["--make", "true", "clean"]).assert().success();

  assert!(!env.path("sourced").exists());
}

#[test]
fn missing_setup_script_is_tolerated() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .env_remove("ARCH")
    .args(["--make", "true", "--setup-script", "missing.sh", "clean"])
    .assert()
    .success()
    .stderr(predicate::str::contains("setup script not found"));
}
