use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::games::Quiz;
use crate::gate::{AccessGate, RevealGate};
use crate::utils;

/// Environment variable overriding the main passphrase
pub const PASSPHRASE_ENV: &str = "KEEPSAKE_PASS";
/// Environment variable overriding the reveal passphrase
pub const REVEAL_PASSPHRASE_ENV: &str = "KEEPSAKE_REVEAL";

/// Fallback secrets, only meant for local unconfigured runs
pub const DEFAULT_PASSPHRASE: &str = "love";
pub const DEFAULT_REVEAL_PASSPHRASE: &str = "italian";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub reveal_passphrase: Option<String>,
    #[serde(default = "default_reveal_message")]
    pub reveal_message: String,
    #[serde(default)]
    pub quiz: Quiz,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            passphrase: None,
            reveal_passphrase: None,
            reveal_message: default_reveal_message(),
            quiz: Quiz::default(),
        }
    }
}

// Default value functions
fn default_data_dir() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::default_data_dir_for_profile(utils::Profile::Prod)
}

fn default_reveal_message() -> String {
    "I miss you more than pizza. Always.".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

/// First non-empty value wins
fn resolve_secret(
    name: &str,
    from_env: Option<String>,
    from_file: Option<&str>,
    fallback: &str,
) -> String {
    if let Some(secret) = from_env.filter(|s| !s.is_empty()) {
        debug!(secret = name, "using secret from environment");
        return secret;
    }
    if let Some(secret) = from_file.filter(|s| !s.is_empty()) {
        debug!(secret = name, "using secret from config file");
        return secret.to_string();
    }
    warn!(secret = name, "no secret configured, using the built-in default");
    fallback.to_string()
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and data paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            // Create default config and save it
            let mut config = Config::default();
            config.data_dir = Self::default_data_dir_for_profile(profile);
            config.save_to_path(&config_path)?;
            info!(path = %config_path.display(), "created default config");
            Ok(config)
        }
    }

    /// Load an explicit config file; it must exist
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default data directory for a specific profile
    fn default_data_dir_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/keepsake-dev".to_string(),
                utils::Profile::Prod => "~/.local/share/keepsake".to_string(),
            }
        }
    }

    /// Get the expanded data directory (with ~ expansion)
    pub fn get_data_dir(&self) -> PathBuf {
        utils::expand_path(&self.data_dir)
    }

    /// Main gate, with the secret taken from the environment, this file or the fallback
    pub fn access_gate(&self) -> AccessGate {
        self.access_gate_with(|key| std::env::var(key).ok())
    }

    pub fn access_gate_with(&self, env: impl Fn(&str) -> Option<String>) -> AccessGate {
        AccessGate::new(resolve_secret(
            "passphrase",
            env(PASSPHRASE_ENV),
            self.passphrase.as_deref(),
            DEFAULT_PASSPHRASE,
        ))
    }

    pub fn reveal_gate(&self) -> RevealGate {
        self.reveal_gate_with(|key| std::env::var(key).ok())
    }

    pub fn reveal_gate_with(&self, env: impl Fn(&str) -> Option<String>) -> RevealGate {
        let secret = resolve_secret(
            "reveal_passphrase",
            env(REVEAL_PASSPHRASE_ENV),
            self.reveal_passphrase.as_deref(),
            DEFAULT_REVEAL_PASSPHRASE,
        );
        RevealGate::new(secret, self.reveal_message.clone())
    }
}
