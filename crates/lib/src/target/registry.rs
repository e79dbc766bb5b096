//! Command-token to target lookup.

use std::collections::BTreeMap;
use std::fmt;

use super::{ArtifactCopy, BuildTarget, OnFailure, Step};
use crate::consts::{DTBS_LOG, IMAGE_LOG};

const KERNEL_IMAGE: &str = "$${out}/arch/arm64/boot/Image";
const BOARD_DTB: &str = "$${out}/arch/arm64/boot/dts/rockchip/rk3399-roc-pc.dtb";

const DEPLOY_IMAGE: ArtifactCopy = ArtifactCopy::new(KERNEL_IMAGE, "$${deploy}");
const DEPLOY_DTB: ArtifactCopy = ArtifactCopy::new(BOARD_DTB, "$${deploy}");

const BUILD_IMAGE: Step = Step::new("$${make} Image -j$${jobs} O=$${out}")
  .log(IMAGE_LOG)
  .banner("Build Image")
  .success_note("Compile Finished !!!");

static BOARD_TARGETS: &[BuildTarget] = &[
  BuildTarget {
    name: "build_kernel",
    about: "full compile kernel",
    steps: &[
      Step::new("$${make} O=$${out} roc-rk3399-pc_defconfig"),
      BUILD_IMAGE,
      Step::new("$${make} dtbs O=$${out}").log(DTBS_LOG).banner("Build dtbs"),
    ],
    artifacts: &[DEPLOY_IMAGE, DEPLOY_DTB],
    success_note: None,
  },
  BuildTarget {
    name: "dtbs",
    about: "compile rk3399-roc-pc.dtb",
    steps: &[Step::new("$${make} dtbs -j$${jobs} O=$${out}").log(DTBS_LOG)],
    artifacts: &[DEPLOY_DTB],
    success_note: None,
  },
  BuildTarget {
    name: "Image",
    about: "compile Image",
    steps: &[Step::new("$${make} Image -j$${jobs} O=$${out}").log(IMAGE_LOG)],
    artifacts: &[DEPLOY_IMAGE],
    success_note: None,
  },
  BuildTarget {
    name: "clean",
    about: "make clean",
    steps: &[
      Step::new("$${make} clean O=$${out}"),
      Step::new("$${make} mrproper O=$${out}"),
    ],
    artifacts: &[],
    success_note: Some("Clean Finish !!!"),
  },
  BuildTarget {
    name: "modules",
    about: "make modules",
    steps: &[
      Step::new("$${make} ARCH=arm64 CROSS_COMPILE=aarch64-linux-gnu- modules")
        .on_failure(OnFailure::Abort)
        .banner("Build Modules")
        .failure_note("COMPILE MODULES FAILED !!!"),
      Step::new("sudo $${make} ARCH=arm64 INSTALL_MOD_PATH=$${modules_root} modules_install")
        .banner("Install Modules"),
    ],
    artifacts: &[],
    success_note: None,
  },
  BuildTarget {
    name: "build_virt",
    about: "make QEMU virt Image",
    steps: &[Step::new("$${make} O=$${out} virt_defconfig"), BUILD_IMAGE],
    artifacts: &[],
    success_note: None,
  },
];

static IN_TREE_TARGETS: &[BuildTarget] = &[
  BuildTarget {
    name: "build_kernel",
    about: "compile Image and dtbs in the source tree",
    steps: &[
      Step::new("$${make} Image").banner("Build Image"),
      Step::new("$${make} dtbs").banner("Build dtbs"),
    ],
    artifacts: &[],
    success_note: None,
  },
  BuildTarget {
    name: "dtbs",
    about: "compile device trees in the source tree",
    steps: &[Step::new("$${make} dtbs")],
    artifacts: &[],
    success_note: None,
  },
  BuildTarget {
    name: "Image",
    about: "compile Image in the source tree",
    steps: &[Step::new("$${make} Image")],
    artifacts: &[],
    success_note: None,
  },
];

/// Which target table to dispatch against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
  /// Out-of-tree ROC-RK3399-PC build with logs and TFTP deploy.
  #[default]
  Board,
  /// Plain in-tree `make` invocations.
  InTree,
}

impl Profile {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Board => "board",
      Self::InTree => "in-tree",
    }
  }
}

impl fmt::Display for Profile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Exact, case-sensitive lookup from command token to target.
#[derive(Debug, Clone)]
pub struct Registry {
  targets: &'static [BuildTarget],
  index: BTreeMap<&'static str, usize>,
}

impl Registry {
  /// Build a registry over a static table. Later duplicates shadow earlier ones.
  pub fn new(targets: &'static [BuildTarget]) -> Self {
    let index = targets.iter().enumerate().map(|(i, t)| (t.name, i)).collect();
    Self { targets, index }
  }

  pub fn for_profile(profile: Profile) -> Self {
    match profile {
      Profile::Board => Self::new(BOARD_TARGETS),
      Profile::InTree => Self::new(IN_TREE_TARGETS),
    }
  }

  pub fn resolve(&self, name: &str) -> Option<&'static BuildTarget> {
    let targets = self.targets;
    self.index.get(name).map(|&i| &targets[i])
  }

  /// Targets in declaration order.
  pub fn targets(&self) -> &'static [BuildTarget] {
    self.targets
  }
}

impl Default for Registry {
  fn default() -> Self {
    Self::for_profile(Profile::Board)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::target::BuildContext;
  use crate::template::substitute;
  use std::path::Path;

  fn commands(target: &BuildTarget) -> Vec<String> {
    let ctx = BuildContext::new("make", Path::new("out"), 32)
      .with_modules_root(Some(Path::new("/home/dev/nfs_rootfs/rootfs")));
    target
      .steps
      .iter()
      .map(|s| substitute(s.command, &ctx).unwrap())
      .collect()
  }

  #[test]
  fn board_profile_recognizes_all_commands() {
    let registry = Registry::default();
    for name in ["build_kernel", "dtbs", "Image", "clean", "modules", "build_virt"] {
      assert_eq!(registry.resolve(name).map(|t| t.name), Some(name));
    }
    assert_eq!(registry.targets().len(), 6);
  }

  #[test]
  fn lookup_is_exact_and_case_sensitive() {
    let registry = Registry::default();
    for name in ["image", "IMAGE", "Image ", "dtb", "build", "", "modules_install"] {
      assert!(registry.resolve(name).is_none(), "{name:?} should not resolve");
    }
  }

  #[test]
  fn build_kernel_steps_in_order() {
    let target = Registry::default().resolve("build_kernel").unwrap();
    assert_eq!(
      commands(target),
      vec![
        "make O=out roc-rk3399-pc_defconfig",
        "make Image -j32 O=out",
        "make dtbs O=out",
      ]
    );
    assert_eq!(target.steps[1].log, Some(IMAGE_LOG));
    assert_eq!(target.steps[2].log, Some(DTBS_LOG));
    assert_eq!(target.artifacts.len(), 2);
  }

  #[test]
  fn clean_has_no_logs_or_artifacts() {
    let target = Registry::default().resolve("clean").unwrap();
    assert!(target.steps.iter().all(|s| s.log.is_none()));
    assert!(target.artifacts.is_empty());
    assert_eq!(commands(target), vec!["make clean O=out", "make mrproper O=out"]);
  }

  #[test]
  fn modules_build_gates_install() {
    let target = Registry::default().resolve("modules").unwrap();
    assert_eq!(target.steps[0].on_failure, OnFailure::Abort);
    assert_eq!(
      commands(target)[1],
      "sudo make ARCH=arm64 INSTALL_MOD_PATH=/home/dev/nfs_rootfs/rootfs modules_install"
    );
  }

  #[test]
  fn build_virt_does_not_deploy() {
    let target = Registry::default().resolve("build_virt").unwrap();
    assert!(target.artifacts.is_empty());
    assert_eq!(commands(target), vec!["make O=out virt_defconfig", "make Image -j32 O=out"]);
  }

  #[test]
  fn in_tree_profile_is_a_subset() {
    let registry = Registry::for_profile(Profile::InTree);
    assert!(registry.resolve("clean").is_none());
    let target = registry.resolve("build_kernel").unwrap();
    assert_eq!(commands(target), vec!["make Image", "make dtbs"]);
    assert!(target.artifacts.is_empty());
  }

  #[test]
  fn every_template_parses() {
    for profile in [Profile::Board, Profile::InTree] {
      for target in Registry::for_profile(profile).targets() {
        for step in target.steps {
          crate::template::parse(step.command).unwrap();
        }
        for copy in target.artifacts {
          crate::template::parse(copy.source).unwrap();
          crate::template::parse(copy.destination).unwrap();
        }
      }
    }
  }
}
