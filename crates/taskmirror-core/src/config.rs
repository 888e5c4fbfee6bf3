//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/taskmirror/config.toml)
//! 3. Environment variables (TASKMIRROR_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "TASKMIRROR";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collection server URL (ws:// or wss://)
    #[serde(default)]
    pub server_url: Option<String>,

    /// Name of the remote collection holding the tasks
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Log file for TUI mode (defaults next to the config file)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            collection: default_collection(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TASKMIRROR_SERVER_URL, TASKMIRROR_COLLECTION)
    /// 2. Config file (~/.config/taskmirror/config.toml or TASKMIRROR_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TASKMIRROR_SERVER_URL
        if let Ok(val) = std::env::var(format!("{}_SERVER_URL", ENV_PREFIX)) {
            self.server_url = if val.is_empty() { None } else { Some(val) };
        }

        // TASKMIRROR_COLLECTION
        if let Ok(val) = std::env::var(format!("{}_COLLECTION", ENV_PREFIX)) {
            if !val.is_empty() {
                self.collection = val;
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TASKMIRROR_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskmirror")
            .join("config.toml")
    }

    /// Default path for the TUI log file
    pub fn default_log_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskmirror")
            .join("debug.log")
    }
}

fn default_collection() -> String {
    "tasks".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap();
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &["TASKMIRROR_SERVER_URL", "TASKMIRROR_COLLECTION"];

    #[test]
    fn test_default_config() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::default();
        assert!(config.server_url.is_none());
        assert_eq!(config.collection, "tasks");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_env_override_server_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(config.server_url.is_none());

        env::set_var("TASKMIRROR_SERVER_URL", "ws://localhost:4040");
        config.apply_env_overrides();
        assert_eq!(config.server_url, Some("ws://localhost:4040".to_string()));

        // Empty string clears it
        env::set_var("TASKMIRROR_SERVER_URL", "");
        config.apply_env_overrides();
        assert!(config.server_url.is_none());
    }

    #[test]
    fn test_env_override_collection() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TASKMIRROR_COLLECTION", "household");
        config.apply_env_overrides();
        assert_eq!(config.collection, "household");

        // Empty string keeps the previous value
        env::set_var("TASKMIRROR_COLLECTION", "");
        config.apply_env_overrides();
        assert_eq!(config.collection, "household");
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            server_url: Some("ws://sync.example.com".to_string()),
            collection: "tasks".to_string(),
            log_file: Some(PathBuf::from("/tmp/taskmirror.log")),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("server_url"));
        assert!(toml_str.contains("collection"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server_url, config.server_url);
        assert_eq!(parsed.collection, config.collection);
        assert_eq!(parsed.log_file, config.log_file);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            server_url = "ws://example.com"
            collection = "groceries"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.server_url, Some("ws://example.com".to_string()));
        assert_eq!(config.collection, "groceries");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert!(config.server_url.is_none());
        assert_eq!(config.collection, "tasks");
    }
}
