use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use book_catalog::application::{IngestionService, PostIngestionCorrector};
use book_catalog::domain::{RawRecord, RecordIdentifier, RecordStore};
use book_catalog::infrastructure::logging::init_logging_with_config;
use book_catalog::infrastructure::{
    AppConfig, BookPageParser, ConfigManager, ContextualParser, DatabaseConnection, PageContext, SqliteRecordStore,
};
use book_catalog::normalization::{RecordNormalizer, UrlRepair};

#[derive(Parser)]
#[command(name = "book-catalog")]
#[command(about = "Normalize scraped book records into a SQLite catalogue")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest raw records from a JSON Lines file
    Ingest {
        /// One raw record per line
        file: PathBuf,
        /// Base URL for relative links (defaults to the configured site root)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Extract and ingest one saved product page
    IngestHtml {
        file: PathBuf,
        /// URL the page was fetched from
        #[arg(long)]
        url: String,
    },
    /// Repair stored records and print the correction report
    Correct,
    /// Print one stored record
    Show { identifier: String },
    /// Print record count and category summary without changing anything
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = manager.load_config().await?;
    init_logging_with_config(&config.logging)?;

    let db = DatabaseConnection::from_config(&config.database).await?;
    db.migrate().await?;
    let store = Arc::new(SqliteRecordStore::new(db.pool().clone()));

    let exit = match cli.command {
        Commands::Ingest { file, base_url } => {
            let raws = read_jsonl(&file).await?;
            ingest(&config, store, raws, base_url.as_deref()).await?
        }
        Commands::IngestHtml { file, url } => {
            let html = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let parser = BookPageParser::with_config(&config.parsing.book_page_selectors)?;
            let raw = parser.parse_document(&html, &PageContext::new(url.clone()))?;
            ingest(&config, store, vec![raw], Some(&url)).await?
        }
        Commands::Correct => {
            let corrector = PostIngestionCorrector::from_config(&config.correction)?;
            let report = corrector.run(store.as_ref()).await?;
            print_json(&report)?;
            ExitCode::SUCCESS
        }
        Commands::Show { identifier } => show(store.as_ref(), &identifier).await?,
        Commands::Stats => {
            let corrector = PostIngestionCorrector::from_config(&config.correction)?;
            let report = corrector.summarize(store.as_ref()).await?;
            print_json(&report)?;
            ExitCode::SUCCESS
        }
    };

    db.close().await;
    Ok(exit)
}

async fn ingest(
    config: &AppConfig,
    store: Arc<SqliteRecordStore>,
    raws: Vec<RawRecord>,
    base_url: Option<&str>,
) -> Result<ExitCode> {
    let normalizer = RecordNormalizer::new(&config.normalization)?
        .with_url_repair(UrlRepair::new(&config.correction.url_segment_fixes));
    let normalizer = Arc::new(normalizer);
    let service = IngestionService::new(store, normalizer, config.ingestion.db_max_concurrency);

    let summary = service.ingest(raws, base_url).await?;
    print_json(&summary)?;

    Ok(if summary.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn show(store: &SqliteRecordStore, identifier: &str) -> Result<ExitCode> {
    let identifier = match RecordIdentifier::parse(identifier.trim()) {
        Ok(identifier) => identifier,
        Err(e) => {
            error!("{}", e);
            eprintln!("invalid identifier: {e}");
            return Ok(ExitCode::from(2));
        }
    };

    match store.find(&identifier).await? {
        Some(record) => {
            print_json(&record)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            info!("No record with identifier {}", identifier);
            eprintln!("not found: {identifier}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Parse a JSON Lines file; blank lines are skipped.
async fn read_jsonl(path: &Path) -> Result<Vec<RawRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid raw record", path.display(), number + 1))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
