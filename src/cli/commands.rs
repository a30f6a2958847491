//! CLI command implementations
//!
//! `init` scaffolds a config file and data directory, `serve` boots the
//! service and runs the HTTP server, `follow` mirrors a remote log.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::client::Replicator;
use crate::config::{Config, StoreBackend};
use crate::db::rules::CounterRule;
use crate::db::Factlog;
use crate::http_server::HttpServer;
use crate::store::{FactStore, FileStore, MemoryStore};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub async fn run() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse_args();
    run_command(cli.command).await
}

/// Run the appropriate command based on CLI args
pub async fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config, port } => serve(&config, port).await,
        Command::Follow {
            url,
            tokens,
            retry_secs,
        } => follow(url, &tokens, retry_secs).await,
    }
}

/// `RUST_LOG` picks the filter; absent, everything at info and up.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize a factlog installation
///
/// Writes the default config file if none exists and creates the data
/// directory. Does not start the server.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    if !config_path.exists() {
        Config::write_default(config_path)?;
    }
    let logs_dir = data_dir.join("logs");
    fs::create_dir_all(&logs_dir).map_err(|e| {
        CliError::config_error(format!("Failed to create directory {:?}: {}", logs_dir, e))
    })?;

    info!(
        config = %config_path.display(),
        data_dir = %data_dir.display(),
        "initialized"
    );
    Ok(())
}

/// Boot the service and serve HTTP until the process dies
///
/// Boot order: config file, then environment overrides, then the --port
/// flag; store and rule registry from the merged config; HTTP last.
pub async fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    config.apply_env();
    if let Some(port) = port {
        config.http.port = port;
    }

    let rules = Arc::new(config.build_rules()?);
    let store: Arc<dyn FactStore> = match config.store {
        StoreBackend::File => Arc::new(FileStore::open(config.data_path())?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    let db = Arc::new(Factlog::new(store, rules));

    info!(store = ?config.store, data_dir = %config.data_dir, "factlog booted");

    let server = HttpServer::with_config(config.http.clone(), db);
    server
        .start()
        .await
        .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))?;

    Ok(())
}

/// Mirror a remote log, printing each snapshot the mirror passes through
pub async fn follow(url: String, tokens: &str, retry_secs: u64) -> CliResult<()> {
    let tokens = parse_tokens(tokens);
    if tokens.is_empty() {
        return Err(CliError::config_error("at least one token is required"));
    }

    let replicator = Replicator::new(url, Arc::new(CounterRule::new(tokens)))
        .with_retry_delay(Duration::from_secs(retry_secs));
    let mut snapshots = replicator.subscribe();

    tokio::spawn(async move { replicator.run().await });

    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        println!("{}", serde_json::to_string(&snapshot)?);
    }
    Ok(())
}

fn parse_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Check if a data directory is initialized
fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("logs").exists()
}
