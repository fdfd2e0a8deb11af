//! Logging setup.
//!
//! The engine only emits through the `log` facade; this module installs
//! `env_logger` behind it for binaries.

mod init;

pub use init::{init_logging, LoggingConfig};
