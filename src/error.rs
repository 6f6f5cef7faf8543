//! Custom error types for chansnap.
//!
//! Provides structured error handling with detailed context for better
//! diagnostics and programmatic handling of the tiered failure policy:
//! some errors isolate a team or channel, some degrade data quality, and
//! some abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for chansnap operations.
#[derive(Error, Debug)]
pub enum SnapError {
    // =========================================================================
    // Mattermost API Errors
    // =========================================================================
    /// Login was rejected or returned no session token.
    #[error("Login to '{url}' failed: {reason}")]
    LoginFailed { url: String, reason: String },

    /// Transport-level failure talking to the Mattermost API.
    #[error("Mattermost API error: {0}")]
    Api(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("Unexpected response from {endpoint}: HTTP {status}")]
    ApiStatus { endpoint: String, status: u16 },

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A load-bearing schema provisioning step failed. Non-fatal steps are
    /// logged and absorbed; this variant only carries the fatal ones.
    #[error("Schema provisioning failed at step '{step}': {source}")]
    Provision {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// A required setting was provided nowhere (flag, env, or config file).
    #[error("Missing required setting '{key}' (set {env} or add it to the config file)")]
    MissingSetting { key: &'static str, env: &'static str },

    /// Environment variable present but unparseable.
    #[error("Invalid environment variable {var}: {reason}")]
    EnvVar { var: String, reason: String },

    // =========================================================================
    // IO / Generic Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped anyhow error for the binary boundary.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for chansnap operations.
pub type Result<T> = std::result::Result<T, SnapError>;

impl SnapError {
    /// Create a login failure error.
    pub fn login_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoginFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an unexpected-status error.
    pub fn api_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::ApiStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Create a fatal provisioning error.
    #[must_use]
    pub const fn provision(step: &'static str, source: sqlx::Error) -> Self {
        Self::Provision { step, source }
    }

    /// Create a config file error.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-setting error.
    #[must_use]
    pub const fn missing_setting(key: &'static str, env: &'static str) -> Self {
        Self::MissingSetting { key, env }
    }

    /// Create an invalid environment variable error.
    pub fn env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
