//! Gateway configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$SMSGATE_CONFIG` (environment variable)
//! 2. `~/.config/smsgate/config.toml` (Linux/macOS)
//!    `%APPDATA%\smsgate\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags and the `PIN`, `PORT` and `SSL` environment variables
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    /// HTTP listener.
    pub server: ServerConfig,
    /// Modem access.
    pub modem: ModemConfig,
    /// Persisted state.
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serve HTTPS with `cert_path` / `key_path`.
    pub tls: bool,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// SIM PIN, entered at startup when the SIM asks for one.
    pub pin: Option<String>,
    /// Storage folder scanned for incoming messages.
    pub folder: u32,
    /// Give up waiting for the modem after this many milliseconds.
    /// Unset waits indefinitely.
    pub gate_timeout_ms: Option<u64>,
    /// JSON file pre-filling the simulated modem's inbox.
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// `user:password` lines for HTTP Basic auth.
    pub credentials: PathBuf,
    /// Missed-call log, one call per line.
    pub missed_calls: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            tls: false,
            cert_path: PathBuf::from("/ssl/cert.pem"),
            key_path: PathBuf::from("/ssl/key.pem"),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            credentials: PathBuf::from("credentials.txt"),
            missed_calls: PathBuf::from("missed_calls.txt"),
        }
    }
}

impl Config {
    /// Copy safe to print: the SIM PIN is masked.
    pub fn redacted(&self) -> Config {
        let mut shown = self.clone();
        if shown.modem.pin.is_some() {
            shown.modem.pin = Some("****".to_string());
        }
        shown
    }
}

impl ModemConfig {
    pub fn gate_timeout(&self) -> Option<Duration> {
        self.gate_timeout_ms.map(Duration::from_millis)
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
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
    if let Ok(env_path) = std::env::var("SMSGATE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("smsgate").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("smsgate")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("smsgate.log")
}
