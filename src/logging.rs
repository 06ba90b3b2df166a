//! Structured logging setup.
//!
//! Logging goes to stderr through `tracing-subscriber` so that JSON reports on
//! stdout stay machine-readable. `RUST_LOG` always wins over the configured
//! level.
//!
//! ```no_run
//! use archfacts::logging::{self, LoggingConfig};
//!
//! logging::init_logging(LoggingConfig::default());
//! tracing::info!("scan started");
//! ```

use std::env;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Configuration for logging initialization.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's own events.
    pub level: Level,

    /// Emit one JSON object per event instead of human-readable lines.
    pub use_json: bool,

    /// Include the module target (e.g. `archfacts::pipeline`).
    pub include_target: bool,

    /// Include file and line number.
    pub include_location: bool,

    /// Include thread id and name; useful with parallel extraction.
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    /// Warnings only, plain output. Scans are quiet unless something is off.
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
            include_target: false,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// `--verbose`: per-extractor progress and per-file detail.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            ..Default::default()
        }
    }

    /// Structured output for log collectors.
    pub fn json() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }
}

/// Parse a level name, case-insensitively. Unknown names yield `None`.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            if let Ok(directive) = format!("archfacts={}", config.level).parse() {
                filter = filter.add_directive(directive);
            }
        }

        let result = if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .try_init()
        };

        // Another subscriber (e.g. a test harness) may already be installed.
        if let Err(e) = result {
            eprintln!("logging not initialized: {}", e);
        }
    });
}

/// Initialize from `ARCHFACTS_LOG_LEVEL` and `ARCHFACTS_LOG_JSON`.
pub fn init_from_env() {
    let json = env::var("ARCHFACTS_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);
    let mut config = if json {
        LoggingConfig::json()
    } else {
        LoggingConfig::default()
    };
    if let Some(level) = env::var("ARCHFACTS_LOG_LEVEL")
        .ok()
        .and_then(|v| parse_level(&v))
    {
        config.level = level;
    }
    init_logging(config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("INFO"), Some(Level::INFO));
        assert_eq!(parse_level("Warning"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    fn test_presets() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.use_json);

        let config = LoggingConfig::verbose();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_target);

        let config = LoggingConfig::json();
        assert!(config.use_json);
        assert!(config.include_thread_ids);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LoggingConfig::with_level(Level::ERROR));
        init_logging(LoggingConfig::verbose());
    }
}
