// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_ANCHOR, DEFAULT_CACHE_DIR, DEFAULT_FILTER, DEFAULT_IMAGE_DIR, DEFAULT_LOG_FORMAT,
    DEFAULT_LOG_LEVEL, DEFAULT_METHOD,
};
use crate::transform::{validate, ImageConfig};

pub mod server;

pub use server::ServerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_DIR)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

/// Where source images are read from and transformed images are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_method() -> i64 {
    DEFAULT_METHOD
}

fn default_filter() -> i64 {
    DEFAULT_FILTER
}

fn default_anchor() -> i64 {
    DEFAULT_ANCHOR
}

/// Parameter values used when a request omits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_method")]
    pub method: i64,
    #[serde(default = "default_filter")]
    pub filter: i64,
    #[serde(default = "default_anchor")]
    pub anchor: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            filter: default_filter(),
            anchor: default_anchor(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_format() -> LogFormat {
    match DEFAULT_LOG_FORMAT {
        "pretty" => LogFormat::Pretty,
        _ => LogFormat::Json,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "kasasagi=debug"; RUST_LOG wins
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load from `path`, or built-in defaults when it does not exist
    ///
    /// Any other read failure is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        match std::fs::read_to_string(path) {
            Ok(yaml) => Self::from_yaml_with_env(&yaml),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("Failed to read config file: {}", e)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.server.socket_addr()?;

        if self.storage.image_dir.as_os_str().is_empty() {
            return Err("storage.image_dir cannot be empty".to_string());
        }
        if self.storage.cache_dir.as_os_str().is_empty() {
            return Err("storage.cache_dir cannot be empty".to_string());
        }

        validate(
            self.defaults.method,
            self.defaults.filter,
            self.defaults.anchor,
        )
        .map_err(|e| format!("Invalid defaults: {}", e))?;

        self.image.validate()?;

        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }

        Ok(())
    }
}
