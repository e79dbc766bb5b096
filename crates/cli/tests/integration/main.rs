//! CLI integration tests.
//!
//! Each test runs the real binary in its own temporary directory, with `true`
//! or `false` standing in for `make`.

mod build_tests;
mod common;
mod env_tests;
