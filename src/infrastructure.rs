//! Infrastructure layer for database connections, storage, parsing, configuration and logging

pub mod config;
pub mod database_connection;
pub mod in_memory_record_store;
pub mod logging;
pub mod parsing;
pub mod sqlite_record_store;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use in_memory_record_store::InMemoryRecordStore;
pub use parsing::{BookPageParser, ContextualParser, PageContext, ParsingConfig, ParsingError, ParsingResult};
pub use sqlite_record_store::SqliteRecordStore;
