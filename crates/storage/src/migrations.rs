//! Versioned schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`. Every step is written
//! so that it also succeeds against databases created before that table
//! existed: the base table uses `IF NOT EXISTS`, the kind column is added only
//! when missing, and indexes use `IF NOT EXISTS`.

use crate::repository::ResponseRepository;
use crate::StorageResult;
use tracing::{debug, info};

/// What a migration does; each backend supplies the SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// Create the `respuestas` table with its original columns
    CreateResponses,
    /// Add `tipo` and backfill it from `dispositivo_id`
    AddKindColumn,
    /// Index `created_at`, `tipo` and `calificacion`
    CreateIndexes,
}

/// A single versioned migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub step: MigrationStep,
}

/// All migrations, in application order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_respuestas",
        step: MigrationStep::CreateResponses,
    },
    Migration {
        version: 2,
        name: "add_tipo_with_backfill",
        step: MigrationStep::AddKindColumn,
    },
    Migration {
        version: 3,
        name: "create_indexes",
        step: MigrationStep::CreateIndexes,
    },
];

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub previous_version: i64,
    pub current_version: i64,
    pub applied: Vec<i64>,
}

pub(crate) const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (\
     version BIGINT PRIMARY KEY, \
     name TEXT NOT NULL, \
     applied_at TEXT NOT NULL)";

pub(crate) const CURRENT_VERSION: &str = "SELECT COALESCE(MAX(version), 0) FROM schema_migrations";

pub(crate) const ADD_KIND_COLUMN: &str = "ALTER TABLE respuestas ADD COLUMN tipo TEXT";

pub(crate) const BACKFILL_KIND: &str = "UPDATE respuestas SET tipo = CASE \
     WHEN lower(coalesce(dispositivo_id, '')) LIKE '%transporte%' THEN 'transporte' \
     WHEN lower(coalesce(dispositivo_id, '')) LIKE '%comedor%' THEN 'comedor' \
     ELSE 'desconocido' END \
     WHERE tipo IS NULL OR tipo = ''";

pub(crate) const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_respuestas_created_at ON respuestas(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_respuestas_tipo ON respuestas(tipo)",
    "CREATE INDEX IF NOT EXISTS idx_respuestas_calif ON respuestas(calificacion)",
];

/// Apply every pending migration in order
pub async fn migrate(repository: &dyn ResponseRepository) -> StorageResult<MigrationReport> {
    let previous_version = repository.schema_version().await?;
    let mut applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| m.version > previous_version) {
        info!("Applying migration {} ({})", migration.version, migration.name);
        repository.apply_migration(migration).await?;
        applied.push(migration.version);
    }

    let current_version = applied.last().copied().unwrap_or(previous_version);
    if applied.is_empty() {
        debug!("Schema up to date at version {}", current_version);
    }

    Ok(MigrationReport {
        previous_version,
        current_version,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_strictly_increase() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(MIGRATIONS[0].version, 1);
    }

    #[test]
    fn test_backfill_checks_transporte_first() {
        let transporte = BACKFILL_KIND.find("'%transporte%'").unwrap();
        let comedor = BACKFILL_KIND.find("'%comedor%'").unwrap();
        assert!(transporte < comedor);
    }
}
