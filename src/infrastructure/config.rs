//! Configuration infrastructure
//!
//! Contains configuration loading and management for the catalog pipeline.
//!
//! Configuration is organized by concern:
//! 1. Database settings (location, pool sizing)
//! 2. Normalization settings (site root, description bound, lookup tables)
//! 3. Correction settings (misspelling table, URL repairs, report prefix)
//! 4. Page extraction selectors
//! 5. Ingestion and logging settings

#![allow(clippy::derivable_impls)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use super::parsing::ParsingConfig;
use crate::normalization::{IndeterminateStockPolicy, RatingVocabulary};

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub normalization: NormalizationConfig,
    pub correction: CorrectionConfig,
    pub parsing: ParsingConfig,
    pub ingestion: IngestionConfig,
    pub logging: LoggingConfig,
}

/// SQLite store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:/var/lib/catalog/books.db`
    pub url: String,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

/// Record normalizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Site root used when a caller supplies no base URL
    pub base_url: String,

    /// Maximum description length in characters (0 = unbounded)
    pub description_max_len: usize,

    /// Classification of availability text that never says "in stock"
    pub indeterminate_availability: IndeterminateStockPolicy,

    /// Rating words recognised besides the digits 1..5
    pub rating_words: RatingVocabulary,
}

/// Post-ingestion corrector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Misspelled category → correct category (exact match)
    pub category_fixes: BTreeMap<String, String>,

    /// Literal URL fragments to replace, applied in order
    pub url_segment_fixes: Vec<(String, String)>,

    /// Prefix every well-formed detail URL starts with
    pub expected_url_prefix: String,

    /// Number of categories listed in the correction report
    pub top_categories: usize,
}

/// Batch ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Maximum concurrent store writes
    pub db_max_concurrency: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output (stderr)
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; defaults to `logs/` in the application data directory
    pub directory: Option<PathBuf>,

    /// Log file name prefix; files roll daily
    pub file_prefix: String,

    /// Module-specific log level filters (e.g., "book_catalog::application": "debug")
    pub module_filters: HashMap<String, String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = ConfigManager::get_app_data_dir()
            .map(|dir| dir.join("catalog").join(defaults::DATABASE_FILE))
            .unwrap_or_else(|_| PathBuf::from(defaults::DATABASE_FILE));
        Self {
            url: format!("sqlite:{}", path.display()),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            busy_timeout_ms: defaults::DB_BUSY_TIMEOUT_MS,
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SITE_ROOT.to_string(),
            description_max_len: defaults::DESCRIPTION_MAX_LEN,
            indeterminate_availability: IndeterminateStockPolicy::default(),
            rating_words: RatingVocabulary::default(),
        }
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            category_fixes: defaults::CATEGORY_FIXES
                .iter()
                .map(|(bad, good)| ((*bad).to_string(), (*good).to_string()))
                .collect(),
            url_segment_fixes: defaults::url_segment_fixes(),
            expected_url_prefix: defaults::EXPECTED_URL_PREFIX.to_string(),
            top_categories: defaults::TOP_CATEGORIES,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            db_max_concurrency: defaults::DB_MAX_CONCURRENCY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            directory: None,
            file_prefix: defaults::LOG_FILE_PREFIX.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("book_catalog".to_string(), defaults::LOG_LEVEL.to_string());
                filters
            },
        }
    }
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
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Manager for the default configuration file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE);
        Ok(Self { config_path })
    }

    /// Manager for an explicit configuration file
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {:?}", self.config_path))?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create config directory {parent:?}"))?;
            }
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write configuration file {:?}", self.config_path))?;

        info!("Configuration saved to: {:?}", self.config_path);
        Ok(())
    }
}

/// Default values for all configuration settings
pub mod defaults {
    pub const APP_DIR_NAME: &str = "book-catalog";
    pub const CONFIG_FILE: &str = "book_catalog_config.json";
    pub const DATABASE_FILE: &str = "books.db";

    /// Site root used to resolve relative links
    pub const SITE_ROOT: &str = "https://books.toscrape.com/";

    /// Every canonical detail page lives under this prefix
    pub const EXPECTED_URL_PREFIX: &str = "https://books.toscrape.com/catalogue/";

    pub const DESCRIPTION_MAX_LEN: usize = 1600;

    pub const DB_MAX_CONNECTIONS: u32 = 10;
    pub const DB_BUSY_TIMEOUT_MS: u64 = 5000;
    pub const DB_MAX_CONCURRENCY: usize = 4;

    pub const TOP_CATEGORIES: usize = 5;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_FILE_PREFIX: &str = "book-catalog.log";

    /// Category labels seen misspelled in scraped breadcrumbs
    pub const CATEGORY_FIXES: &[(&str, &str)] = &[
        ("Spiritality", "Spirituality"),
        ("Bsiness", "Business"),
        ("Adlt Fiction", "Adult Fiction"),
        ("Atobiography", "Autobiography"),
        ("Seqential Art", "Sequential Art"),
        ("Hmor", "Humor"),
        ("New Adlt", "New Adult"),
        ("Yong Adlt", "Young Adult"),
        ("Cltral", "Cultural"),
        ("Sspense", "Suspense"),
        ("Childrens", "Children's"),
        ("Womens Fiction", "Women's Fiction"),
        ("Add a comment", "Nonfiction"),
        ("Food and Drink", "Food & Drink"),
    ];

    /// Misspelled path segment and double-encoded path separator
    pub const URL_SEGMENT_FIXES: &[(&str, &str)] = &[("/cataloge/", "/catalogue/"), ("%252F", "/")];

    pub fn url_segment_fixes() -> Vec<(String, String)> {
        URL_SEGMENT_FIXES
            .iter()
            .map(|(bad, good)| ((*bad).to_string(), (*good).to_string()))
            .collect()
    }
}
