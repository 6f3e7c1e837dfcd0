//! Storage Layer
//!
//! Persists survey responses in either an embedded SQLite file or a Postgres
//! server behind one repository interface, selected once at startup.

mod config;
mod migrations;
mod model;
mod postgres;
mod query;
mod repository;
mod sqlite;

pub use config::{DatabaseSettings, DatabaseTarget, DEFAULT_DB_FILE};
pub use migrations::{migrate, Migration, MigrationReport, MigrationStep, MIGRATIONS};
pub use model::{format_timestamp, BackendInfo, NewResponse, ResponseFilter, StoredResponse, SummaryRow};
pub use postgres::PostgresRepository;
pub use repository::{connect, ResponseRepository};
pub use sqlite::SqliteRepository;

use thiserror::Error;

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Migration {version} ({name}) failed: {source}")]
    MigrationError {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
