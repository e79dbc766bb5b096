//! Fixed names shared across the crate.

pub const APP_NAME: &str = "rkbuild";

/// Environment variable selecting the target architecture.
pub const ARCH_VAR: &str = "ARCH";
/// Environment variable holding the cross-compiler prefix.
pub const CROSS_COMPILE_VAR: &str = "CROSS_COMPILE";

/// `ARCH` value that makes the tool refuse to run.
pub const RESERVED_ARCH: &str = "arm64";
/// `CROSS_COMPILE` value that makes the tool refuse to run.
pub const RESERVED_CROSS_COMPILE: &str = "aarch64-linux-gnu-";

pub const DEPLOY_DIR_VAR: &str = "RKBUILD_DEPLOY_DIR";
pub const MODULES_ROOT_VAR: &str = "RKBUILD_MODULES_ROOT";

pub const DEFAULT_MAKE: &str = "make";
pub const DEFAULT_JOBS: u16 = 32;
pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_SETUP_SCRIPT: &str = "setenv.sh";

pub const IMAGE_LOG: &str = "build_Image.log";
pub const DTBS_LOG: &str = "build_dtbs.log";
