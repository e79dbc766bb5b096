//! rkbuild-lib: build orchestration for the ROC-RK3399-PC kernel tree.
//!
//! This crate provides the pieces behind the `rkbuild` command:
//! - `target`: static tables mapping command tokens to build steps and artifacts
//! - `env`: toolchain environment inspection and one-shot setup
//! - `runner`: shell command execution with log tee
//! - `deploy`: artifact copies into the network-boot directory
//! - `dispatch`: the single-shot command dispatcher and its run report

pub mod consts;
pub mod deploy;
pub mod dispatch;
pub mod env;
pub mod platform;
pub mod report;
pub mod runner;
pub mod target;
pub mod template;
pub mod util;
