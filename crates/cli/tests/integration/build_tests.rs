//! Target execution integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

const IMAGE: &str = "out/arch/arm64/boot/Image";
const DTB: &str = "out/arch/arm64/boot/dts/rockchip/rk3399-roc-pc.dtb";

#[test]
fn image_builds_logs_and_deploys() {
  let env = TestEnv::new().with_deploy_dir();
  env.write_file(IMAGE, "kernel");

  env
    .rkbuild_cmd()
    .args(["--make", "true", "Image"])
    .assert()
    .code(0)
    .stdout(predicate::str::contains("copy Image to"));

  assert!(env.path("build_Image.log").exists());
  assert_eq!(std::fs::read_to_string(env.deploy_dir().join("Image")).unwrap(), "kernel");
}

#[test]
fn image_log_is_truncated_and_captures_output() {
  let env = TestEnv::new();
  env.write_file("build_Image.log", "stale output from an earlier build\n");

  env.rkbuild_cmd().args(["--make", "echo", "Image"]).assert().success();

  let log = std::fs::read_to_string(env.path("build_Image.log")).unwrap();
  assert_eq!(log, "Image -j32 O=out\n");
}

#[test]
fn missing_deploy_dir_is_not_an_error() {
  let env = TestEnv::new();
  env.write_file(IMAGE, "kernel");

  env
    .rkbuild_cmd()
    .args(["--make", "true", "Image"])
    .assert()
    .success()
    .stdout(predicate::str::contains("not exist!"));

  assert!(!env.deploy_dir().exists());
}

#[test]
fn deploy_dir_flag_overrides_environment() {
  let env = TestEnv::new();
  env.write_file(IMAGE, "kernel");
  let custom = env.path("custom");
  std::fs::create_dir(&custom).unwrap();

  env
    .rkbuild_cmd()
    .args(["--make", "true", "--deploy-dir"])
    .arg(&custom)
    .arg("Image")
    .assert()
    .success();

  assert!(custom.join("Image").exists());
}

#[test]
fn build_kernel_runs_every_phase() {
  let env = TestEnv::new().with_deploy_dir();
  env.write_file(IMAGE, "kernel");
  env.write_file(DTB, "dtb");

  env
    .rkbuild_cmd()
    .args(["--make", "true", "build_kernel"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Start Build Image"))
    .stdout(predicate::str::contains("Compile Finished !!!"))
    .stdout(predicate::str::contains("End Build dtbs"));

  assert!(env.path("build_Image.log").exists());
  assert!(env.path("build_dtbs.log").exists());
  assert!(env.deploy_dir().join("Image").exists());
  assert!(env.deploy_dir().join("rk3399-roc-pc.dtb").exists());
}

#[test]
fn failed_image_build_exits_nonzero() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .args(["--make", "false", "Image"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Image failed"));
}

#[test]
fn failed_module_build_skips_install() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .args(["--make", "false", "modules"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("COMPILE MODULES FAILED !!!"))
    .stdout(predicate::str::contains("Start Install Modules").not());
}

#[test]
fn clean_writes_no_logs() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .args(["--make", "true", "clean"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Clean Finish !!!"));

  assert!(!env.path("build_Image.log").exists());
  assert!(!env.path("build_dtbs.log").exists());
}

#[test]
fn failed_clean_still_runs_mrproper() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .args(["--make", "false", "clean"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("false mrproper O=out"))
    .stdout(predicate::str::contains("Clean Finish !!!").not());
}

#[test]
fn json_output_reports_steps() {
  let env = TestEnv::new();

  let output = env
    .rkbuild_cmd()
    .args(["--make", "true", "--output", "json", "dtbs"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["target"], "dtbs");
  assert_eq!(report["dry_run"], false);
  assert_eq!(report["steps"][0]["command"], "true dtbs -j32 O=out");
  assert_eq!(report["steps"][0]["status"], "succeeded");
  assert_eq!(report["deploy"]["entries"][0]["status"], "skipped_missing_destination");
}

#[test]
fn in_tree_profile_runs_plain_make() {
  let env = TestEnv::new();

  env
    .rkbuild_cmd()
    .args(["--make", "echo", "--profile", "in-tree", "Image"])
    .assert()
    .success()
    .stdout(predicate::str::contains("echo Image"));

  assert!(!env.path("build_Image.log").exists());
}
