//! Logging setup for chansnap.
//!
//! Uses the `tracing` ecosystem. The run narrates itself at info level
//! (teams found, batches committed); skipped teams and channels surface as
//! errors without stopping the run.

use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include target (module path) in log output.
    pub target: bool,
    /// Enable ANSI colors in output.
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Off,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            timestamps: true,
            target: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Config for quiet mode (errors only).
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            timestamps: false,
            target: false,
            colors: true,
        }
    }

    /// Config for verbose mode (debug level, with targets).
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            timestamps: true,
            target: true,
            colors: true,
        }
    }
}

impl LogLevel {
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Off => "off",
        }
    }
}

/// Initialize the logging system with the given configuration.
///
/// Should be called once at startup; subsequent calls are ignored.
/// `RUST_LOG`, when set, wins over the configured level.
pub fn init_logging(config: &LogConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("chansnap={}", config.level.to_filter_string()))
    };

    let layer = fmt::layer()
        .compact()
        .with_ansi(config.colors)
        .with_target(config.target);

    if config.timestamps {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.without_time())
            .try_init()
            .ok();
    }
}

/// Initialize logging with defaults suitable for CLI use.
pub fn init_cli_logging(quiet: bool, verbose: bool) {
    let config = if quiet {
        LogConfig::quiet()
    } else if verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(LogConfig::quiet().level, LogLevel::Error);
        assert_eq!(LogConfig::verbose().level, LogLevel::Debug);
        assert_eq!(LogConfig::default().level, LogLevel::Info);
    }

    #[test]
    fn filter_strings() {
        assert_eq!(LogLevel::Info.to_filter_string(), "info");
        assert_eq!(LogLevel::Off.to_filter_string(), "off");
    }
}
