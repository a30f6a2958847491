//! CLI module for factlog
//!
//! Provides the command-line interface:
//! - init: write a default config and create the data directory
//! - serve: boot the service and serve HTTP
//! - follow: mirror a remote log and print its snapshots

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{follow, init, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
