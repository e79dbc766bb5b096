//! Default locations for deploy and module-install directories.
//!
//! Both can be overridden on the command line; these helpers only supply the
//! fallbacks used when no flag is given.

use std::path::PathBuf;

use crate::consts::{DEPLOY_DIR_VAR, MODULES_ROOT_VAR};

/// Returns the user's home directory, if `HOME` is set and non-empty.
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").filter(|h| !h.is_empty()).map(PathBuf::from)
}

/// Directory the TFTP server exports to the board.
///
/// `$RKBUILD_DEPLOY_DIR` if set, otherwise `~/tftpboot`.
pub fn deploy_dir() -> Option<PathBuf> {
  std::env::var_os(DEPLOY_DIR_VAR)
    .filter(|v| !v.is_empty())
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|h| h.join("tftpboot")))
}

/// NFS root filesystem that `modules_install` writes into.
///
/// `$RKBUILD_MODULES_ROOT` if set, otherwise `~/nfs_rootfs/rootfs`.
pub fn modules_root() -> Option<PathBuf> {
  std::env::var_os(MODULES_ROOT_VAR)
    .filter(|v| !v.is_empty())
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|h| h.join("nfs_rootfs").join("rootfs")))
}
