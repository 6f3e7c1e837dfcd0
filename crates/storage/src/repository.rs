//! Repository Interface

use crate::config::DatabaseTarget;
use crate::migrations::Migration;
use crate::model::{BackendInfo, NewResponse, ResponseFilter, StoredResponse, SummaryRow};
use crate::postgres::PostgresRepository;
use crate::sqlite::SqliteRepository;
use crate::StorageResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Persistence contract for survey responses.
///
/// Rows are append-only: there is no update or delete.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Engine name and, for file databases, the resolved path
    fn describe(&self) -> BackendInfo;

    /// Highest applied migration version, creating the bookkeeping table
    /// when it does not exist yet
    async fn schema_version(&self) -> StorageResult<i64>;

    /// Apply one migration and record it, atomically
    async fn apply_migration(&self, migration: &Migration) -> StorageResult<()>;

    /// Insert a response, returning its assigned identifier
    async fn insert(&self, response: &NewResponse) -> StorageResult<i64>;

    /// Matching rows, newest first
    async fn list(&self, filter: &ResponseFilter) -> StorageResult<Vec<StoredResponse>>;

    /// Counts per (day, kind, rating), oldest day first
    async fn summarize(&self, filter: &ResponseFilter) -> StorageResult<Vec<SummaryRow>>;
}

/// Open the repository for the resolved backend
pub async fn connect(
    target: &DatabaseTarget,
    max_connections: u32,
) -> StorageResult<Arc<dyn ResponseRepository>> {
    let repository: Arc<dyn ResponseRepository> = match target {
        DatabaseTarget::Sqlite { path } => {
            Arc::new(SqliteRepository::connect(path, max_connections).await?)
        }
        DatabaseTarget::Postgres { url } => {
            Arc::new(PostgresRepository::connect(url, max_connections).await?)
        }
    };

    let info = repository.describe();
    info!(
        "Connected to {} backend{}",
        info.engine,
        info.path.map(|p| format!(" at {p}")).unwrap_or_default()
    );

    Ok(repository)
}
