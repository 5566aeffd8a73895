// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::infrastructure::config::{DatabaseConfig, defaults};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Connect with default pool settings.
    pub async fn new(database_url: &str) -> Result<Self> {
        let config = DatabaseConfig {
            url: database_url.to_string(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            busy_timeout_ms: defaults::DB_BUSY_TIMEOUT_MS,
        };
        Self::from_config(&config).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let db_path = config
            .url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create database directory {parent:?}"))?;
            }
        }

        // WAL gives one writer and many readers; a reader never sees a half-written row.
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Invalid database URL: {}", config.url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", config.url))?;

        info!("Connected to database: {}", config.url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_books_sql = r"
            CREATE TABLE IF NOT EXISTS books (
                identifier TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                category TEXT,
                price REAL,
                rating INTEGER,
                availability TEXT,
                available_count INTEGER NOT NULL DEFAULT 0,
                upc TEXT,
                description TEXT,
                image_url TEXT,
                detail_url TEXT
            )
        ";

        let create_indexes_sql = r"
            CREATE INDEX IF NOT EXISTS idx_books_category ON books (category)
        ";

        sqlx::query(create_books_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        debug!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
