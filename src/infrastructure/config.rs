//! Configuration infrastructure
//!
//! Settings are read from a JSON file under the user config directory
//! (created with defaults on first run) and then overlaid with
//! `RESTOCK__<SECTION>__<KEY>` environment variables, so secrets such as the
//! email API key can stay out of the file.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::infrastructure::availability_parser::DEFAULT_AVAILABILITY_SELECTOR;
use crate::infrastructure::http_client::{BROWSER_USER_AGENT, DEFAULT_ACCEPT_LANGUAGE};

pub const APP_DIR_NAME: &str = "restock-monitor";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_PREFIX: &str = "RESTOCK";

/// Default values shared by the config sections
pub mod defaults {
    pub const FETCH_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 5;
    pub const MAX_CONCURRENCY: usize = 4;
    pub const OPERATION_TIMEOUT_SECONDS: u64 = 20;
    pub const NOTIFIER_TIMEOUT_SECONDS: u64 = 20;
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_FILE_NAME: &str = "restock-monitor.log";
    pub const MAX_LOG_FILES: u32 = 14;
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub extractor: ExtractorConfig,
    pub runner: RunnerConfig,
    pub database: DatabaseConfig,
    pub notifier: NotifierConfig,
    pub logging: LoggingConfig,
}

/// Outbound page requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    /// Politeness limit across all products; 0 disables it
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

/// Where the availability notice sits in the page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub availability_selector: String,
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Products checked in parallel
    pub max_concurrency: usize,
    /// Upper bound for a single store or notifier call
    pub operation_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLx connection URL, e.g. `sqlite:/var/lib/restock/restock.db`
    pub url: String,
}

/// Transactional email API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
    pub timeout_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Base name of the daily-rolled log file
    pub file_name: String,
    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,
    pub auto_cleanup_logs: bool,
    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: defaults::FETCH_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            follow_redirects: true,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            availability_selector: DEFAULT_AVAILABILITY_SELECTOR.to_string(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: defaults::MAX_CONCURRENCY,
            operation_timeout_seconds: defaults::OPERATION_TIMEOUT_SECONDS,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = ConfigManager::get_app_data_dir()
            .map(|dir| dir.join("restock.db"))
            .unwrap_or_else(|_| PathBuf::from("restock.db"));
        Self {
            url: format!("sqlite:{}", path.display()),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            from_address: String::new(),
            timeout_seconds: defaults::NOTIFIER_TIMEOUT_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_filters = HashMap::new();
        module_filters.insert("sqlx".to_string(), "warn".to_string());
        module_filters.insert("reqwest".to_string(), "info".to_string());

        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            max_files: defaults::MAX_LOG_FILES,
            auto_cleanup_logs: true,
            module_filters,
        }
    }
}

impl NotifierConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty() && !self.from_address.trim().is_empty()
    }
}

impl AppConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.user_agent.trim().is_empty() {
            bail!("fetcher.user_agent must not be empty");
        }
        if self.fetcher.timeout_seconds == 0 {
            bail!("fetcher.timeout_seconds must be greater than 0");
        }
        if self.runner.operation_timeout_seconds == 0 {
            bail!("runner.operation_timeout_seconds must be greater than 0");
        }
        if self.extractor.availability_selector.trim().is_empty() {
            bail!("extractor.availability_selector must not be empty");
        }
        if self.database.url.trim().is_empty() {
            bail!("database.url must not be empty");
        }
        if !self.notifier.is_configured() {
            bail!("notifier.api_url and notifier.from_address are required");
        }
        if self.notifier.timeout_seconds == 0 {
            bail!("notifier.timeout_seconds must be greater than 0");
        }
        Ok(())
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Existing,
    CreatedDefault,
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration, writing the defaults first if no file exists yet
    pub async fn load_config(&self) -> Result<AppConfig> {
        self.load_config_with_origin().await.map(|(config, _)| config)
    }

    /// Like [`Self::load_config`], also reporting whether the defaults were
    /// just written. Callers that load before the subscriber is installed
    /// use the origin to log afterwards.
    pub async fn load_config_with_origin(&self) -> Result<(AppConfig, ConfigOrigin)> {
        let origin = if self.config_path.exists() {
            ConfigOrigin::Existing
        } else {
            debug!("Configuration file not found, creating default: {:?}", self.config_path);
            self.save_config(&AppConfig::default()).await?;
            ConfigOrigin::CreatedDefault
        };

        let config = Self::layered(&self.config_path)?;
        debug!("Loaded configuration from: {:?}", self.config_path);
        Ok((config, origin))
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write configuration file: {:?}", self.config_path))?;

        info!("Configuration saved to: {:?}", self.config_path);
        Ok(())
    }

    fn layered(path: &Path) -> Result<AppConfig> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration: {:?}", path))?;

        settings
            .try_deserialize::<AppConfig>()
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.notifier = NotifierConfig {
            api_url: "https://mail.example/emails".to_string(),
            api_key: "key".to_string(),
            from_address: "alerts@example.com".to_string(),
            timeout_seconds: 10,
        };
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.extractor.availability_selector, "#availability");
        assert_eq!(config.fetcher.accept_language, "en-US,en;q=0.9");
        assert!(config.fetcher.user_agent.starts_with("Mozilla/5.0"));
        assert!(config.database.url.starts_with("sqlite:"));
        assert!(config.runner.max_concurrency > 0);
    }

    #[test]
    fn test_validate() {
        assert!(configured().validate().is_ok());

        // notifier must be set up explicitly
        assert!(AppConfig::default().validate().is_err());

        let mut zero_timeout = configured();
        zero_timeout.fetcher.timeout_seconds = 0;
        assert!(zero_timeout.validate().is_err());

        let mut no_db = configured();
        no_db.database.url = "  ".to_string();
        assert!(no_db.validate().is_err());
    }

    #[tokio::test]
    async fn test_first_load_writes_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let manager = ConfigManager::with_path(&path);

        let config = manager.load_config().await?;
        assert!(path.exists());
        assert_eq!(config.runner.max_concurrency, defaults::MAX_CONCURRENCY);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_reports_origin() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join(CONFIG_FILE_NAME));

        let (_, first) = manager.load_config_with_origin().await?;
        let (_, second) = manager.load_config_with_origin().await?;

        assert_eq!(first, ConfigOrigin::CreatedDefault);
        assert_eq!(second, ConfigOrigin::Existing);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{ "runner": { "max_concurrency": 9 }, "notifier": { "from_address": "a@b.c" } }"#,
        )?;

        let config = ConfigManager::with_path(&path).load_config().await?;
        assert_eq!(config.runner.max_concurrency, 9);
        assert_eq!(config.runner.operation_timeout_seconds, defaults::OPERATION_TIMEOUT_SECONDS);
        assert_eq!(config.notifier.from_address, "a@b.c");
        assert_eq!(config.fetcher.timeout_seconds, defaults::FETCH_TIMEOUT_SECONDS);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join(CONFIG_FILE_NAME));

        let mut config = configured();
        config.logging.level = "debug".to_string();
        manager.save_config(&config).await?;

        let loaded = manager.load_config().await?;
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.notifier.api_url, "https://mail.example/emails");
        Ok(())
    }
}
