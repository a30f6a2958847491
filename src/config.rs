//! # Service Configuration
//!
//! One JSON file describing the whole service: HTTP surface, data
//! directory, store backend, and the rule wiring. `factlog init` writes
//! the default file; a missing file means defaults. The environment
//! overrides the file for the two knobs deployments most often set:
//! `FACTLOG_PORT` and `FACTLOG_DATA_DIR`.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::db::rules::{CounterRule, IntegrationRule, RuleRegistry};
use crate::http_server::HttpServerConfig;

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server section.
    #[serde(default)]
    pub http: HttpServerConfig,

    /// Data directory for the file-backed store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Which store backs the logs.
    #[serde(default)]
    pub store: StoreBackend,

    /// Rule wiring section.
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Append-only record files under `data_dir`.
    File,
    /// Volatile; facts vanish with the process.
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::File
    }
}

/// Rule wiring: which rule governs which log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule id every log gets unless bound otherwise.
    #[serde(default = "default_rule_id")]
    pub default_rule: String,

    /// Tokens the counter rule accepts.
    #[serde(default = "default_counter_tokens")]
    pub counter_tokens: Vec<String>,

    /// Per-log bindings, log name to rule id.
    #[serde(default)]
    pub bindings: HashMap<String, String>,
}

fn default_data_dir() -> String {
    "./factlog-data".to_string()
}

fn default_rule_id() -> String {
    "counter/v1".to_string()
}

fn default_counter_tokens() -> Vec<String> {
    vec!["cool".to_string()]
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            default_rule: default_rule_id(),
            counter_tokens: default_counter_tokens(),
            bindings: HashMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpServerConfig::default(),
            data_dir: default_data_dir(),
            store: StoreBackend::default(),
            rules: RulesConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("can not write config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("config {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from `path`. A missing file yields defaults;
    /// an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let pretty = serde_json::to_string_pretty(&Config::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        fs::write(path, pretty + "\n").map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Environment beats file: `FACTLOG_PORT` and `FACTLOG_DATA_DIR`.
    pub fn apply_env(&mut self) {
        if let Ok(raw) = env::var("FACTLOG_PORT") {
            match raw.parse::<u16>() {
                Ok(port) => self.http.port = port,
                Err(_) => warn!(value = %raw, "ignoring unparsable FACTLOG_PORT"),
            }
        }
        if let Ok(dir) = env::var("FACTLOG_DATA_DIR") {
            if dir.is_empty() {
                warn!("ignoring empty FACTLOG_DATA_DIR");
            } else {
                self.data_dir = dir;
            }
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.validate().map_err(ConfigError::Invalid)?;
        if self.data_dir.is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".to_string()));
        }
        if self.rules.counter_tokens.is_empty() {
            return Err(ConfigError::Invalid(
                "rules.counter_tokens must not be empty".to_string(),
            ));
        }
        self.rule_from_id(&self.rules.default_rule)?;
        for id in self.rules.bindings.values() {
            self.rule_from_id(id)?;
        }
        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Build the rule registry this config describes.
    pub fn build_rules(&self) -> Result<RuleRegistry, ConfigError> {
        let default_rule = self.rule_from_id(&self.rules.default_rule)?;
        let mut registry = RuleRegistry::new(default_rule);
        for (log, id) in &self.rules.bindings {
            registry.bind(log.clone(), self.rule_from_id(id)?);
        }
        Ok(registry)
    }

    fn rule_from_id(&self, id: &str) -> Result<Arc<dyn IntegrationRule>, ConfigError> {
        match id {
            "counter/v1" => Ok(Arc::new(CounterRule::new(
                self.rules.counter_tokens.iter().cloned(),
            ))),
            other => Err(ConfigError::Invalid(format!("unknown rule id {other:?}"))),
        }
    }
}
