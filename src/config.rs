//! Configuration management for waitless.
//!
//! Settings live in `~/.waitless/settings.json`. Every field has a
//! sensible default so a missing or partial file still produces a
//! usable configuration.

#![allow(dead_code)]

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level settings structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP server binding
    #[serde(default)]
    pub server: ServerSettings,

    /// Authentication and session handling
    #[serde(default)]
    pub auth: AuthSettings,

    /// Defaults applied to newly created queues
    #[serde(default)]
    pub defaults: QueueDefaults,

    /// On-disk storage locations
    #[serde(default)]
    pub storage: StorageSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Secret used to sign session tokens. Generated on `setup` when unset.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Session lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

/// Defaults for queues that do not specify their own values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDefaults {
    /// Swap budget granted to each new token
    #[serde(default = "default_max_swaps")]
    pub max_swaps_per_token: u32,

    /// Minutes of service per person, used for wait estimates
    #[serde(default = "default_service_time")]
    pub service_time_minutes: u32,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path to the account directory database. Defaults to
    /// `~/.waitless/directory.db` when unset.
    #[serde(default)]
    pub directory_db: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_token_ttl() -> u64 {
    86400
}

fn default_max_swaps() -> u32 {
    8
}

fn default_service_time() -> u32 {
    5
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self {
            max_swaps_per_token: default_max_swaps(),
            service_time_minutes: default_service_time(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { directory_db: None }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            defaults: QueueDefaults::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    /// Resolve the directory database path, falling back to the home dir.
    pub fn directory_db_path(&self) -> Result<PathBuf> {
        match &self.storage.directory_db {
            Some(path) => Ok(path.clone()),
            None => Ok(get_home_dir()?.join("directory.db")),
        }
    }

    /// Address string suitable for a TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the waitless home directory (`~/.waitless`).
pub fn get_home_dir() -> Result<PathBuf> {
    let user_dirs = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    Ok(user_dirs.home_dir().join(".waitless"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from a specific file.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Run 'waitless setup' first.",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    Ok(settings)
}

/// Load settings from the default location.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

/// Load settings, falling back to defaults when no file exists yet.
pub fn load_settings_or_default() -> Settings {
    match load_settings() {
        Ok(settings) => settings,
        Err(_) => Settings::default(),
    }
}

/// Save settings to a specific file, creating parent directories as needed.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}

/// Save settings to the default location.
pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&get_settings_path()?, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.defaults.max_swaps_per_token, 8);
        assert_eq!(settings.defaults.service_time_minutes, 5);
        assert!(settings.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.defaults.max_swaps_per_token, 8);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.server.port = 4242;
        settings.auth.jwt_secret = Some("sekrit".to_string());

        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path).unwrap();
        assert_eq!(loaded.server.port, 4242);
        assert_eq!(loaded.auth.jwt_secret.as_deref(), Some("sekrit"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_settings_from(&dir.path().join("nope.json"));
        assert!(result.is_err());
    }
}
