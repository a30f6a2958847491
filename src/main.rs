//! factlog CLI entry point
//!
//! Parses arguments, dispatches to CLI commands, prints errors to stderr,
//! exits non-zero on failure. All logic lives in the cli module.

use factlog::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
