//! Shared pieces of the linegrep binaries: build-config parsing and the
//! walker driver.

pub mod config;
