//! Configuration for the photo search client.
//!
//! Stored as TOML at `~/.config/photo-search/config.toml` (or the XDG
//! equivalent). The password is never written to the file; it comes from the
//! `PHOTO_SEARCH_PASSWORD` environment variable.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! url = "https://cloud.example.com"
//! user = "alice"
//! search_path = "/api/search/photos"
//! timeout_secs = 30
//!
//! [search]
//! debounce_ms = 5000
//! page_multiplier = 15
//! prefetch_rows = 2
//! default_columns = 3
//! mime_types = ["image/", "video/"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::model::types::{Account, MimeFilter};
use crate::pager::DEFAULT_PREFETCH_ROWS;
use crate::task::{DEFAULT_DEBOUNCE, DEFAULT_PAGE_MULTIPLIER, TaskSettings};

pub const PASSWORD_ENV: &str = "PHOTO_SEARCH_PASSWORD";

/// Errors that can occur when loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PhotoSearchConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Where and as whom to search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. "https://cloud.example.com". Empty until configured.
    pub url: String,
    pub user: String,
    /// Path of the search endpoint below `url`.
    pub search_path: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            search_path: "/api/search/photos".into(),
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the account to search with.
    pub fn account(&self, password: Option<String>) -> Result<Account, ConfigError> {
        if !self.is_configured() {
            return Err(ConfigError::Validation(
                "server.url is not set; run `photo-search config init` and edit the file".into(),
            ));
        }
        let account = Account::new(self.url.clone(), self.user.clone());
        Ok(match password {
            Some(pw) => account.with_password(pw),
            None => account,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "server.timeout_secs must be positive".into(),
            ));
        }
        if !self.is_configured() {
            return Ok(());
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "server.url must start with http:// or https://, got {:?}",
                self.url
            )));
        }
        if self.user.is_empty() {
            return Err(ConfigError::Validation(
                "server.user is required when server.url is set".into(),
            ));
        }
        Ok(())
    }
}

/// Paging behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub page_multiplier: usize,
    /// Rows left below the viewport before the next page is requested.
    pub prefetch_rows: usize,
    pub default_columns: usize,
    pub mime_types: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            page_multiplier: DEFAULT_PAGE_MULTIPLIER,
            prefetch_rows: DEFAULT_PREFETCH_ROWS,
            default_columns: 3,
            mime_types: MimeFilter::photos_and_videos().prefixes,
        }
    }
}

impl SearchConfig {
    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            page_multiplier: self.page_multiplier,
        }
    }

    pub fn mime_filter(&self) -> MimeFilter {
        MimeFilter::new(self.mime_types.iter().cloned())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_multiplier == 0 {
            return Err(ConfigError::Validation(
                "search.page_multiplier must be positive".into(),
            ));
        }
        if self.default_columns == 0 {
            return Err(ConfigError::Validation(
                "search.default_columns must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl PhotoSearchConfig {
    /// Load configuration from the default location.
    ///
    /// Returns an empty config if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// - Primary: `$XDG_CONFIG_HOME/photo-search/config.toml`
    /// - Fallback: platform config dir (e.g. `~/.config/photo-search/config.toml` on Linux)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config)
                .join("photo-search")
                .join("config.toml"));
        }

        dirs::config_dir()
            .map(|p| p.join("photo-search").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.search.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_task_defaults() {
        let config = PhotoSearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.task_settings(), TaskSettings::default());
        assert_eq!(config.search.mime_filter(), MimeFilter::photos_and_videos());
        assert!(!config.server.is_configured());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: PhotoSearchConfig = toml::from_str(
            r#"
            [server]
            url = "https://cloud.example.com"
            user = "alice"

            [search]
            page_multiplier = 10
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.page_multiplier, 10);
        assert_eq!(config.search.debounce_ms, 5000);
        assert_eq!(config.server.timeout_secs, 30);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = PhotoSearchConfig::default();
        config.search.page_multiplier = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = PhotoSearchConfig::default();
        config.server.url = "cloud.example.com".into();
        config.server.user = "alice".into();
        assert!(config.validate().is_err());

        let mut config = PhotoSearchConfig::default();
        config.server.url = "https://cloud.example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn account_requires_url() {
        let mut server = ServerConfig::default();
        assert!(server.account(None).is_err());
        server.url = "https://cloud.example.com".into();
        server.user = "alice".into();
        let acc = server.account(Some("pw".into())).unwrap();
        assert_eq!(acc.password.as_deref(), Some("pw"));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = PhotoSearchConfig::default();
        config.server.url = "https://cloud.example.com".into();
        config.server.user = "alice".into();
        config.search.debounce_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = PhotoSearchConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = PhotoSearchConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, PhotoSearchConfig::default());
    }

    #[test]
    fn invalid_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\npage_multiplier = \"lots\"\n").unwrap();
        assert!(matches!(
            PhotoSearchConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    #[serial]
    fn config_path_respects_xdg() {
        let dir = TempDir::new().unwrap();
        let prev = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", dir.path()) };
        let path = PhotoSearchConfig::config_path().unwrap();
        match prev {
            Some(v) => unsafe { std::env::set_var("XDG_CONFIG_HOME", v) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        assert_eq!(path, dir.path().join("photo-search").join("config.toml"));
    }
}
