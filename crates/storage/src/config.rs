//! Backend selection

use std::path::PathBuf;
use tracing::{info, warn};

/// File name of the embedded database
pub const DEFAULT_DB_FILE: &str = "encuesta.db";

/// Connection-string schemes that select the Postgres backend
const POSTGRES_SCHEMES: [&str; 2] = ["postgres://", "postgresql://"];

/// Inputs for choosing a database backend, gathered once at startup
#[derive(Debug, Clone, Default)]
pub struct DatabaseSettings {
    /// Connection string, e.g. from `DATABASE_URL`
    pub database_url: Option<String>,
    /// Explicit SQLite file override
    pub sqlite_path: Option<PathBuf>,
    /// Name of the detected hosting platform, if any
    pub hosted_platform: Option<String>,
    /// Directory holding the running executable
    pub program_dir: Option<PathBuf>,
}

/// Resolved backend
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Embedded SQLite file
    Sqlite { path: PathBuf },
    /// Networked Postgres server
    Postgres { url: String },
}

impl DatabaseTarget {
    /// Pick the backend.
    ///
    /// A connection string with a Postgres scheme selects Postgres. Otherwise
    /// the SQLite file is, in order: the explicit override, a file in the OS
    /// temp directory on a hosting platform, or a file beside the executable.
    pub fn resolve(settings: &DatabaseSettings) -> Self {
        if let Some(url) = settings.database_url.as_deref().map(str::trim) {
            if POSTGRES_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
                return DatabaseTarget::Postgres {
                    url: url.to_string(),
                };
            }
            if !url.is_empty() {
                warn!("Ignoring database URL with unsupported scheme, using SQLite");
            }
        }

        let path = if let Some(path) = &settings.sqlite_path {
            path.clone()
        } else if let Some(platform) = &settings.hosted_platform {
            info!("Hosting platform {} detected, placing SQLite in temp dir", platform);
            std::env::temp_dir().join(DEFAULT_DB_FILE)
        } else {
            settings
                .program_dir
                .as_ref()
                .map(|dir| dir.join(DEFAULT_DB_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
        };

        DatabaseTarget::Sqlite { path }
    }

    /// Engine name
    pub fn engine(&self) -> &'static str {
        match self {
            DatabaseTarget::Sqlite { .. } => "sqlite",
            DatabaseTarget::Postgres { .. } => "postgres",
        }
    }
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            // credentials live in the URL
            DatabaseTarget::Postgres { .. } => f.debug_struct("Postgres").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_url_selects_postgres() {
        for url in ["postgres://u:p@db/encuesta", "postgresql://db/encuesta"] {
            let settings = DatabaseSettings {
                database_url: Some(url.to_string()),
                sqlite_path: Some(PathBuf::from("/ignored.db")),
                ..Default::default()
            };
            assert_eq!(
                DatabaseTarget::resolve(&settings),
                DatabaseTarget::Postgres { url: url.to_string() }
            );
        }
    }

    #[test]
    fn test_unknown_scheme_falls_back_to_sqlite() {
        let settings = DatabaseSettings {
            database_url: Some("mysql://db/encuesta".to_string()),
            program_dir: Some(PathBuf::from("/srv/app")),
            ..Default::default()
        };
        assert_eq!(
            DatabaseTarget::resolve(&settings),
            DatabaseTarget::Sqlite {
                path: PathBuf::from("/srv/app/encuesta.db")
            }
        );
    }

    #[test]
    fn test_override_beats_platform() {
        let settings = DatabaseSettings {
            sqlite_path: Some(PathBuf::from("/data/kiosk.db")),
            hosted_platform: Some("RENDER".to_string()),
            ..Default::default()
        };
        assert_eq!(
            DatabaseTarget::resolve(&settings),
            DatabaseTarget::Sqlite {
                path: PathBuf::from("/data/kiosk.db")
            }
        );
    }

    #[test]
    fn test_hosted_platform_uses_temp_dir() {
        let settings = DatabaseSettings {
            hosted_platform: Some("RENDER".to_string()),
            program_dir: Some(PathBuf::from("/srv/app")),
            ..Default::default()
        };
        assert_eq!(
            DatabaseTarget::resolve(&settings),
            DatabaseTarget::Sqlite {
                path: std::env::temp_dir().join(DEFAULT_DB_FILE)
            }
        );
    }

    #[test]
    fn test_debug_hides_postgres_url() {
        let target = DatabaseTarget::Postgres {
            url: "postgres://user:secret@db/encuesta".to_string(),
        };
        assert!(!format!("{target:?}").contains("secret"));
        assert_eq!(target.engine(), "postgres");
    }
}
