//! Postgres Repository

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
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{Postgres, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_RESPONSES: &str = "CREATE TABLE IF NOT EXISTS respuestas (\
     id BIGSERIAL PRIMARY KEY, \
     created_at TEXT NOT NULL, \
     sede TEXT, \
     dispositivo_id TEXT, \
     calificacion TEXT NOT NULL, \
     motivo TEXT NOT NULL, \
     meta TEXT)";

const HAS_KIND_COLUMN: &str = "SELECT COUNT(*) FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = 'respuestas' AND column_name = 'tipo'";

const INSERT_RESPONSE: &str = "INSERT INTO respuestas \
     (created_at, sede, dispositivo_id, calificacion, motivo, meta, tipo) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";

const RECORD_MIGRATION: &str =
    "INSERT INTO schema_migrations (version, name, applied_at) VALUES ($1, $2, $3)";

/// Server-side TCP keepalive settings sent as startup options.
///
/// They travel in the `options` startup parameter, which PgBouncer-style
/// poolers reject unless configured with `ignore_startup_parameters = options`.
const KEEPALIVE_OPTIONS: [(&str, &str); 3] = [
    ("tcp_keepalives_idle", "30"),
    ("tcp_keepalives_interval", "10"),
    ("tcp_keepalives_count", "5"),
];

/// Whether the URL query names an SSL mode, in either spelling sqlx accepts
fn names_ssl_mode(url: &str) -> bool {
    url.split_once('?')
        .map(|(_, query)| {
            query
                .split('&')
                .filter_map(|pair| pair.split('=').next())
                .any(|key| key == "sslmode" || key == "ssl-mode")
        })
        .unwrap_or(false)
}

/// Build connection options from a URL. TLS is required unless the URL
/// already names an SSL mode.
pub(crate) fn connect_options(url: &str) -> StorageResult<PgConnectOptions> {
    let mut options = PgConnectOptions::from_str(url)?;
    if !names_ssl_mode(url) {
        options = options.ssl_mode(PgSslMode::Require);
    }
    Ok(options.options(KEEPALIVE_OPTIONS))
}

/// Repository backed by a Postgres server
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect to the server at `url`
    pub async fn connect(url: &str, max_connections: u32) -> StorageResult<Self> {
        let options = connect_options(url)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Connected to Postgres");
        Ok(Self { pool })
    }

    async fn run_step(tx: &mut Transaction<'_, Postgres>, step: MigrationStep) -> Result<(), sqlx::Error> {
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
impl crate::repository::ResponseRepository for PostgresRepository {
    fn describe(&self) -> BackendInfo {
        BackendInfo {
            engine: "postgres",
            path: None,
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
        let id: i64 = sqlx::query_scalar(INSERT_RESPONSE)
            .bind(&response.created_at)
            .bind(&response.site)
            .bind(&response.device_id)
            .bind(response.rating.as_str())
            .bind(&response.reason)
            .bind(&response.meta)
            .bind(response.kind.as_str())
            .fetch_one(&self.pool)
            .await?;

        debug!("Inserted response with ID {}", id);
        Ok(id)
    }

    async fn list(&self, filter: &ResponseFilter) -> StorageResult<Vec<StoredResponse>> {
        let mut query = list_query::<Postgres>(filter);
        let rows = query
            .build_query_as::<StoredResponse>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn summarize(&self, filter: &ResponseFilter) -> StorageResult<Vec<SummaryRow>> {
        let mut query = summary_query::<Postgres>(filter);
        let rows = query
            .build_query_as::<SummaryRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
