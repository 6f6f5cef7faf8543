//! Configuration system for chansnap.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/chansnap/config.toml`
//! 3. **Environment variables** - `MM_*`, `PG_*`, `API_DELAY`, `BATCH_SIZE`
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [mattermost]
//! url = "https://chat.example.com"
//! login_id = "snapshot-bot"
//!
//! [database]
//! host = "localhost"
//! port = 5432
//! dbname = "presence"
//!
//! [collect]
//! api_delay_ms = 1
//! page_size = 200
//! batch_size = 100
//!
//! [schema]
//! compress_after_days = 1
//! ```

use crate::error::{Result, SnapError};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure for chansnap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mattermost connection settings.
    pub mattermost: MattermostConfig,
    /// PostgreSQL/TimescaleDB connection settings.
    pub database: DatabaseConfig,
    /// Collection and write tuning.
    pub collect: CollectConfig,
    /// Schema provisioning settings.
    pub schema: SchemaSection,
}

/// Mattermost server and credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MattermostConfig {
    /// Base server URL, e.g. `https://chat.example.com`.
    /// Environment variable: `MM_URL`
    pub url: Option<String>,

    /// Login id (username or email).
    /// Environment variable: `MM_USER`
    pub login_id: Option<String>,

    /// Password. Prefer `MM_PASSWORD` over the config file.
    pub password: Option<String>,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable: `PG_HOST`
    pub host: String,
    /// Environment variable: `PG_PORT`
    pub port: u16,
    /// Environment variable: `PG_USER`
    pub user: Option<String>,
    /// Environment variable: `PG_PASSWORD`
    pub password: Option<String>,
    /// Environment variable: `PG_DB`
    pub dbname: Option<String>,
}

/// Collection and write-phase tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Pause after every API call, in milliseconds.
    /// Environment variable: `API_DELAY` (in seconds, may be fractional)
    pub api_delay_ms: u64,

    /// Channel members fetched per page.
    pub page_size: u32,

    /// Records per database commit.
    /// Environment variable: `BATCH_SIZE`
    pub batch_size: usize,
}

/// Schema provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSection {
    /// Compress data older than this many days.
    pub compress_after_days: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: None,
            password: None,
            dbname: None,
        }
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            api_delay_ms: 1,
            page_size: 200,
            batch_size: 100,
        }
    }
}

impl Default for SchemaSection {
    fn default() -> Self {
        Self {
            compress_after_days: 1,
        }
    }
}

impl MattermostConfig {
    /// The (url, `login_id`, password) triple, or the first missing setting.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::MissingSetting`] naming the setting and its
    /// environment variable.
    pub fn credentials(&self) -> Result<(String, String, String)> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| SnapError::missing_setting("mattermost.url", "MM_URL"))?;
        let login_id = self
            .login_id
            .as_ref()
            .ok_or_else(|| SnapError::missing_setting("mattermost.login_id", "MM_USER"))?;
        let password = self
            .password
            .as_ref()
            .ok_or_else(|| SnapError::missing_setting("mattermost.password", "MM_PASSWORD"))?;
        Ok((
            url.trim_end_matches('/').to_string(),
            login_id.clone(),
            password.clone(),
        ))
    }
}

impl DatabaseConfig {
    /// Build connection options for the single run-long connection.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::MissingSetting`] if user, password, or database
    /// name is absent.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| SnapError::missing_setting("database.user", "PG_USER"))?;
        let password = self
            .password
            .as_ref()
            .ok_or_else(|| SnapError::missing_setting("database.password", "PG_PASSWORD"))?;
        let dbname = self
            .dbname
            .as_ref()
            .ok_or_else(|| SnapError::missing_setting("database.dbname", "PG_DB"))?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(user)
            .password(password)
            .database(dbname))
    }
}

impl CollectConfig {
    /// Inter-call delay as a [`Duration`].
    #[must_use]
    pub const fn api_delay(&self) -> Duration {
        Duration::from_millis(self.api_delay_ms)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (`~/.config/chansnap/config.toml`)
    /// 3. Compiled defaults
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config.redacted());
        config
    }

    /// Load configuration from a specific file, then apply env overrides.
    #[must_use]
    pub fn load_with_file(path: Option<&PathBuf>) -> Self {
        path.map_or_else(Self::load, |path| {
            let mut config = Self::default();
            if let Some(file_config) = Self::load_from_file(path) {
                config.merge(file_config);
            }
            config.apply_env_overrides();
            config
        })
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &PathBuf) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from: {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load the user configuration file from the standard location.
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chansnap").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MM_URL") {
            self.mattermost.url = Some(url);
        }
        if let Ok(login_id) = std::env::var("MM_USER") {
            self.mattermost.login_id = Some(login_id);
        }
        if let Ok(password) = std::env::var("MM_PASSWORD") {
            self.mattermost.password = Some(password);
        }

        if let Ok(host) = std::env::var("PG_HOST") {
            self.database.host = host;
        }
        if let Ok(port) = std::env::var("PG_PORT") {
            match port.parse() {
                Ok(n) => self.database.port = n,
                Err(_) => warn!("Ignoring unparseable PG_PORT: {port}"),
            }
        }
        if let Ok(user) = std::env::var("PG_USER") {
            self.database.user = Some(user);
        }
        if let Ok(password) = std::env::var("PG_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Ok(dbname) = std::env::var("PG_DB") {
            self.database.dbname = Some(dbname);
        }

        // API_DELAY is in (possibly fractional) seconds.
        if let Ok(delay) = std::env::var("API_DELAY") {
            match delay.parse::<f64>() {
                Ok(secs) if secs >= 0.0 => {
                    self.collect.api_delay_ms = (secs * 1000.0) as u64;
                }
                _ => warn!("Ignoring unparseable API_DELAY: {delay}"),
            }
        }
        if let Ok(batch) = std::env::var("BATCH_SIZE") {
            match batch.parse() {
                Ok(n) if n > 0 => self.collect.batch_size = n,
                _ => warn!("Ignoring unparseable BATCH_SIZE: {batch}"),
            }
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        if other.mattermost.url.is_some() {
            self.mattermost.url = other.mattermost.url;
        }
        if other.mattermost.login_id.is_some() {
            self.mattermost.login_id = other.mattermost.login_id;
        }
        if other.mattermost.password.is_some() {
            self.mattermost.password = other.mattermost.password;
        }

        self.database.host = other.database.host;
        self.database.port = other.database.port;
        if other.database.user.is_some() {
            self.database.user = other.database.user;
        }
        if other.database.password.is_some() {
            self.database.password = other.database.password;
        }
        if other.database.dbname.is_some() {
            self.database.dbname = other.database.dbname;
        }

        self.collect.api_delay_ms = other.collect.api_delay_ms;
        self.collect.page_size = other.collect.page_size;
        self.collect.batch_size = other.collect.batch_size;
        self.schema.compress_after_days = other.schema.compress_after_days;
    }

    /// A copy safe to print or log: secrets replaced with a placeholder.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.mattermost.password.is_some() {
            copy.mattermost.password = Some("********".to_string());
        }
        if copy.database.password.is_some() {
            copy.database.password = Some("********".to_string());
        }
        copy
    }

    /// Save the current configuration to the user config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the parent directory cannot be created, or the file cannot be written.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let config_path = Self::user_config_path().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            )
        })?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&config_path, content)?;
        info!("Saved config to: {}", config_path.display());
        Ok(config_path)
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
