//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$ORDERMATCH_CONFIG` (environment variable)
//! 2. `~/.config/ordermatch/config.toml` (Linux/macOS)
//!    `%APPDATA%\ordermatch\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OrderMatchError, Result};
use crate::export::csv::CsvOptions;
use crate::parser::patterns::{default_patterns, PatternDef, PatternSet};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Export defaults.
    pub export: ExportConfig,
    /// Order-number pattern cascade.
    pub patterns: PatternsConfig,
    /// Extraction service settings.
    pub service: ServiceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// CSV field separator character.
    pub csv_separator: char,
    /// Write a UTF-8 BOM at the start of CSV files.
    pub csv_bom: bool,
    /// Indent JSON output.
    pub pretty_json: bool,
}

/// The order-number cascade, highest priority first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    pub order_number: Vec<PatternDef>,
}

/// Extraction service settings.
///
/// Credentials are never stored in the file; only the names of the
/// environment variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Model identifier sent with each request.
    pub model: String,
    /// Upper bound on generated tokens per request.
    pub max_completion_tokens: u32,
    /// System prompt override.
    pub system_prompt: Option<String>,
    /// Directory holding the attachment documents.
    pub documents_dir: Option<PathBuf>,
    /// Environment variable with the API key.
    pub api_key_env: String,
    /// Environment variable with the service endpoint URL.
    pub endpoint_env: String,
}

/// Resolved service credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub endpoint: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_separator: ',',
            csv_bom: false,
            pretty_json: true,
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            order_number: default_patterns(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_completion_tokens: 3000,
            system_prompt: None,
            documents_dir: None,
            api_key_env: "ORDERMATCH_API_KEY".to_string(),
            endpoint_env: "ORDERMATCH_ENDPOINT".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            separator: self.csv_separator,
            bom: self.csv_bom,
        }
    }
}

impl PatternsConfig {
    /// Compile the configured cascade.
    pub fn build(&self) -> Result<PatternSet> {
        PatternSet::from_defs(&self.order_number)
    }
}

impl ServiceConfig {
    /// Directory that attachment filenames are resolved against; the
    /// working directory when unset.
    pub fn documents_root(&self) -> &Path {
        self.documents_dir.as_deref().unwrap_or(Path::new("."))
    }

    /// Read the credentials from the configured environment variables.
    ///
    /// Surrounding double quotes (as left by some `.env` loaders) are
    /// stripped. Fails with [`OrderMatchError::MissingCredentials`] naming
    /// every variable that is unset or empty.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    fn credentials_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().trim_matches('"').to_string())
                .filter(|v| !v.is_empty())
        };
        match (read(&self.api_key_env), read(&self.endpoint_env)) {
            (Some(api_key), Some(endpoint)) => Ok(Credentials { api_key, endpoint }),
            (key, endpoint) => {
                let missing: Vec<&str> = [
                    (key.is_none(), self.api_key_env.as_str()),
                    (endpoint.is_none(), self.endpoint_env.as_str()),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(OrderMatchError::MissingCredentials(missing.join(", ")))
            }
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("ORDERMATCH_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("ordermatch").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ordermatch")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("ordermatch.log")
}
