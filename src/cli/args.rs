//! CLI argument definitions using clap
//!
//! Commands:
//! - factlog init --config <path>
//! - factlog serve --config <path> [--port <port>]
//! - factlog follow <url> [--tokens <csv>] [--retry-secs <n>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Factlog - append-only fact logs with folded state, served over HTTP
#[derive(Parser, Debug)]
#[command(name = "factlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file and create the data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./factlog.json")]
        config: PathBuf,
    },

    /// Serve the fact logs over HTTP
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./factlog.json")]
        config: PathBuf,

        /// Listen port, overriding config and environment
        #[arg(long)]
        port: Option<u16>,
    },

    /// Mirror a remote log, printing its snapshot as facts arrive
    Follow {
        /// Base URL of the log, e.g. http://localhost:8000/foo
        url: String,

        /// Comma-separated tokens the counter rule accepts
        #[arg(long, default_value = "cool")]
        tokens: String,

        /// Seconds to wait before restarting a failed sync
        #[arg(long, default_value_t = 2)]
        retry_secs: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
