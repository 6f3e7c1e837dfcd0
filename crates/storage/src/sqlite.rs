//! SQLite Repository

use crate::migrations::{
    Migration, MigrationStep, ADD_KIND_COLUMN, BACKFILL_KIND, CREATE_INDEXES,
    CREATE_MIGRATIONS_TABLE, CURRENT_VERSION,
};
use crate::model::{
    format_timestamp, BackendInfo, NewResponse, ResponseFilter, StoredResponse, SummaryRow,
};
use crate::query::{list_query, summary_query};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CREATE_RESPONSES: &str = "CREATE TABLE IF NOT EXISTS respuestas (\
     id INTEGER PRIMARY KEY AUTOINCREMENT, \
     created_at TEXT NOT NULL, \
     sede TEXT, \
     dispositivo_id TEXT, \
     calificacion TEXT NOT NULL, \
     motivo TEXT NOT NULL, \
     meta TEXT)";

const HAS_KIND_COLUMN: &str =
    "SELECT COUNT(*) FROM pragma_table_info('respuestas') WHERE name = 'tipo'";

const INSERT_RESPONSE: &str = "INSERT INTO respuestas \
     (created_at, sede, dispositivo_id, calificacion, motivo, meta, tipo) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

const RECORD_MIGRATION: &str =
    "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)";

/// Repository backed by an embedded SQLite file.
///
/// Connections run in WAL mode with `synchronous = NORMAL`; SQLite serializes
/// writers, so identifiers stay unique under concurrent inserts.
pub struct SqliteRepository {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteRepository {
    /// Open (creating if needed) the database file at `path`
    pub async fn connect(path: &Path, max_connections: u32) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Opened SQLite database at {}", path.display());

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_step(tx: &mut Transaction<'_, Sqlite>, step: MigrationStep) -> Result<(), sqlx::Error> {
        match step {
            MigrationStep::CreateResponses => {
                sqlx::query(CREATE_RESPONSES).execute(&mut **tx).await?;
            }
            MigrationStep::AddKindColumn => {
                let present: i64 = sqlx::query_scalar(HAS_KIND_COLUMN)
                    .fetch_one(&mut **tx)
                    .await?;
                if present == 0 {
                    sqlx::query(ADD_KIND_COLUMN).execute(&mut **tx).await?;
                }
                let backfilled = sqlx::query(BACKFILL_KIND).execute(&mut **tx).await?;
                info!("Backfilled tipo on {} rows", backfilled.rows_affected());
            }
            MigrationStep::CreateIndexes => {
                for statement in CREATE_INDEXES {
                    sqlx::query(statement).execute(&mut **tx).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl crate::repository::ResponseRepository for SqliteRepository {
    fn describe(&self) -> BackendInfo {
        BackendInfo {
            engine: "sqlite",
            path: Some(self.path.display().to_string()),
        }
    }

    async fn schema_version(&self) -> StorageResult<i64> {
        sqlx::query(CREATE_MIGRATIONS_TABLE).execute(&self.pool).await?;
        let version: i64 = sqlx::query_scalar(CURRENT_VERSION)
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    async fn apply_migration(&self, migration: &Migration) -> StorageResult<()> {
        let failed = |source: sqlx::Error| StorageError::MigrationError {
            version: migration.version,
            name: migration.name,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        Self::run_step(&mut tx, migration.step).await.map_err(failed)?;
        sqlx::query(RECORD_MIGRATION)
            .bind(migration.version)
            .bind(migration.name)
            .bind(format_timestamp(chrono::Utc::now()))
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)?;

        Ok(())
    }

    async fn insert(&self, response: &NewResponse) -> StorageResult<i64> {
        let id = sqlx::query(INSERT_RESPONSE)
            .bind(&response.created_at)
            .bind(&response.site)
            .bind(&response.device_id)
            .bind(response.rating.as_str())
            .bind(&response.reason)
            .bind(&response.meta)
            .bind(response.kind.as_str())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        debug!("Inserted response with ID {}", id);
        Ok(id)
    }

    async fn list(&self, filter: &ResponseFilter) -> StorageResult<Vec<StoredResponse>> {
        let mut query = list_query::<Sqlite>(filter);
        let rows = query
            .build_query_as::<StoredResponse>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn summarize(&self, filter: &ResponseFilter) -> StorageResult<Vec<SummaryRow>> {
        let mut query = summary_query::<Sqlite>(filter);
        let rows = query
            .build_query_as::<SummaryRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{migrate, MIGRATIONS};
    use crate::repository::ResponseRepository;
    use data_validator::{Kind, Rating};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> SqliteRepository {
        SqliteRepository::connect(&dir.path().join("encuesta.db"), 4)
            .await
            .unwrap()
    }

    async fn migrated(dir: &TempDir) -> SqliteRepository {
        let repo = open(dir).await;
        migrate(&repo).await.unwrap();
        repo
    }

    fn response(created_at: &str, rating: Rating, kind: Kind) -> NewResponse {
        NewResponse {
            created_at: created_at.to_string(),
            site: "Planta 1".to_string(),
            device_id: format!("kiosk-{}", kind.as_str()),
            rating,
            reason: "ok".to_string(),
            meta: "{}".to_string(),
            kind,
        }
    }

    async fn seed(repo: &SqliteRepository) {
        let rows = [
            ("2023-12-31T23:59:59Z", Rating::Malo, Kind::Comedor),
            ("2024-01-01T00:00:00Z", Rating::Bueno, Kind::Comedor),
            ("2024-01-01T18:30:00Z", Rating::Bueno, Kind::Comedor),
            ("2024-01-15T09:00:00Z", Rating::Excelente, Kind::Transporte),
            ("2024-01-31T23:59:59Z", Rating::Regular, Kind::Transporte),
            ("2024-02-01T00:00:00Z", Rating::Bueno, Kind::Transporte),
        ];
        for (created_at, rating, kind) in rows {
            repo.insert(&response(created_at, rating, kind)).await.unwrap();
        }
    }

    fn january() -> ResponseFilter {
        ResponseFilter::from_params(None, Some("2024-01-01"), Some("2024-01-31"))
    }

    #[tokio::test]
    async fn test_migrate_fresh_database() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;

        let report = migrate(&repo).await.unwrap();
        assert_eq!(report.previous_version, 0);
        assert_eq!(report.applied, vec![1, 2, 3]);

        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'respuestas' \
             AND name LIKE 'idx_%' ORDER BY name",
        )
        .fetch_all(repo.pool())
        .await
        .unwrap();
        assert_eq!(
            indexes,
            vec![
                "idx_respuestas_calif",
                "idx_respuestas_created_at",
                "idx_respuestas_tipo"
            ]
        );
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let repo = migrated(&dir).await;

        let report = migrate(&repo).await.unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.current_version, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_legacy_schema_is_backfilled() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;

        sqlx::query(CREATE_RESPONSES).execute(repo.pool()).await.unwrap();
        for device in ["Kiosk-TRANSPORTE-01", "comedor-norte", "tablet-3", ""] {
            sqlx::query(
                "INSERT INTO respuestas (created_at, sede, dispositivo_id, calificacion, motivo, meta) \
                 VALUES ('2024-01-01T10:00:00Z', '', ?, 'Bueno', 'ok', '{}')",
            )
            .bind(device)
            .execute(repo.pool())
            .await
            .unwrap();
        }

        migrate(&repo).await.unwrap();

        let kinds: Vec<String> = sqlx::query_scalar("SELECT tipo FROM respuestas ORDER BY id")
            .fetch_all(repo.pool())
            .await
            .unwrap();
        assert_eq!(kinds, vec!["transporte", "comedor", "desconocido", "desconocido"]);
    }

    #[tokio::test]
    async fn test_schema_with_kind_column_but_no_ledger() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;

        sqlx::query(CREATE_RESPONSES).execute(repo.pool()).await.unwrap();
        sqlx::query(ADD_KIND_COLUMN).execute(repo.pool()).await.unwrap();
        sqlx::query(
            "INSERT INTO respuestas (created_at, calificacion, motivo, tipo, dispositivo_id) \
             VALUES ('2024-01-01T10:00:00Z', 'Malo', 'frio', 'comedor', 'kiosk-transporte')",
        )
        .execute(repo.pool())
        .await
        .unwrap();

        let report = migrate(&repo).await.unwrap();
        assert_eq!(report.applied, vec![1, 2, 3]);

        let rows = repo.list(&ResponseFilter::default()).await.unwrap();
        assert_eq!(rows[0].tipo, "comedor");
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let repo = migrated(&dir).await;

        let mut last = 0;
        for _ in 0..5 {
            let id = repo
                .insert(&response("2024-01-01T00:00:00Z", Rating::Bueno, Kind::Comedor))
                .await
                .unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_unique_ids() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(migrated(&dir).await);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.insert(&response("2024-01-01T00:00:00Z", Rating::Bueno, Kind::Comedor))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }

    #[tokio::test]
    async fn test_list_filters_by_date_range_newest_first() {
        let dir = TempDir::new().unwrap();
        let repo = migrated(&dir).await;
        seed(&repo).await;

        let rows = repo.list(&january()).await.unwrap();
        let stamps: Vec<&str> = rows.iter().map(|r| r.created_at.as_str()).collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-31T23:59:59Z",
                "2024-01-15T09:00:00Z",
                "2024-01-01T18:30:00Z",
                "2024-01-01T00:00:00Z",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_kind() {
        let dir = TempDir::new().unwrap();
        let repo = migrated(&dir).await;
        seed(&repo).await;

        let filter = ResponseFilter::from_params(Some("transporte"), None, None);
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.tipo == "transporte"));

        let ignored = ResponseFilter::from_params(Some("bogus"), None, None);
        assert_eq!(repo.list(&ignored).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_summary_matches_manual_tally() {
        let dir = TempDir::new().unwrap();
        let repo = migrated(&dir).await;
        seed(&repo).await;

        let filter = january();
        let rows = repo.list(&filter).await.unwrap();
        let mut expected: BTreeMap<(String, String, String), i64> = BTreeMap::new();
        for row in &rows {
            let key = (
                row.created_at[..10].to_string(),
                row.tipo.clone(),
                row.calificacion.clone(),
            );
            *expected.entry(key).or_default() += 1;
        }

        let summary = repo.summarize(&filter).await.unwrap();
        let actual: BTreeMap<(String, String, String), i64> = summary
            .iter()
            .map(|r| ((r.dia.clone(), r.tipo.clone(), r.calificacion.clone()), r.n))
            .collect();
        assert_eq!(actual, expected);

        let days: Vec<&str> = summary.iter().map(|r| r.dia.as_str()).collect();
        let mut sorted = days.clone();
        sorted.sort_unstable();
        assert_eq!(days, sorted);
        assert_eq!(summary[0], SummaryRow {
            dia: "2024-01-01".to_string(),
            tipo: "comedor".to_string(),
            calificacion: "Bueno".to_string(),
            n: 2,
        });
    }

    #[tokio::test]
    async fn test_describe_reports_path() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir).await;
        let info = repo.describe();
        assert_eq!(info.engine, "sqlite");
        assert!(info.path.unwrap().ends_with("encuesta.db"));
    }
}
