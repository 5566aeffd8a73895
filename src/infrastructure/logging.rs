//! Logging system configuration and initialization
//!
//! This module provides the logging setup for the CLI and library:
//! - Console output on stderr (stdout is reserved for command results)
//! - Optional daily-rolling file output, plain or JSON
//! - Configuration based log level control with `RUST_LOG` override

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::Local;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::infrastructure::config::ConfigManager;
pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writers alive for the life of the process
static LOG_GUARDS: Lazy<Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Local time with milliseconds and UTC offset
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Log directory from configuration, or `logs/` in the application data directory
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.directory.clone().unwrap_or_else(|| {
        ConfigManager::get_app_data_dir()
            .map(|dir| dir.join("logs"))
            .unwrap_or_else(|_| PathBuf::from("logs"))
    })
}

/// Build the filter: `RUST_LOG` wins; otherwise the configured level plus
/// module filters, with sqlx chatter suppressed below TRACE.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if !config.level.to_lowercase().contains("trace") {
        for directive in ["sqlx::query=warn", "sqlx::sqlite=warn"] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    // Sorted so the resulting filter does not depend on map order
    let mut modules: Vec<_> = config.module_filters.iter().collect();
    modules.sort();
    for (module, level) in modules {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| anyhow!("Invalid log directive '{}': {}", directive, e))?,
        );
    }

    Ok(filter)
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(config)?;

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    let mut log_dir = None;
    let file_layer = if config.file_output {
        let dir = get_log_directory(config);
        std::fs::create_dir_all(&dir).map_err(|e| anyhow!("Failed to create log directory {:?}: {}", dir, e))?;

        let (file_writer, file_guard) = non_blocking(rolling::daily(&dir, &config.file_prefix));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);
        log_dir = Some(dir);

        let layer = if config.json_format {
            fmt::Layer::new()
                .json()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed()
        } else {
            fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .with_ansi(false)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized (level: {}, json: {})", config.level, config.json_format);
    if let Some(dir) = log_dir {
        info!("Log directory: {:?}", dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_output);
        assert!(!config.file_output);
    }

    #[test]
    fn test_explicit_log_directory_wins() {
        let config = LoggingConfig {
            directory: Some(PathBuf::from("/tmp/catalog-logs")),
            ..LoggingConfig::default()
        };
        assert_eq!(get_log_directory(&config), PathBuf::from("/tmp/catalog-logs"));
        assert!(get_log_directory(&LoggingConfig::default()).ends_with("logs"));
    }

    #[test]
    fn test_rejects_invalid_module_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let mut config = LoggingConfig::default();
        config.module_filters.insert("sqlx".to_string(), "not a level!".to_string());
        assert!(build_env_filter(&config).is_err());
    }

    #[test]
    fn test_trace_level_keeps_sqlx_output() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(!LoggingConfig::default().module_filters.contains_key("sqlx"));

        let trace = LoggingConfig {
            level: "trace".to_string(),
            ..LoggingConfig::default()
        };
        assert!(!build_env_filter(&trace).unwrap().to_string().contains("sqlx"));

        let info = build_env_filter(&LoggingConfig::default()).unwrap().to_string();
        assert!(info.contains("sqlx::query"));
    }

    #[test]
    fn test_requires_an_output() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging_with_config(&config).is_err());
    }
}
