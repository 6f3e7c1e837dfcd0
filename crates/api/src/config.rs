//! Process configuration, read once from the environment at startup

use crate::content::ContentRoots;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use storage::{DatabaseSettings, DatabaseTarget};
use thiserror::Error;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variables whose presence marks a hosting platform
const PLATFORM_MARKERS: [&str; 5] = ["RENDER", "RAILWAY_ENVIRONMENT", "FLY_APP_NAME", "DYNO", "VERCEL"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Install the global tracing subscriber. `RUST_LOG` overrides `level`.
    pub fn init(&self) -> Result<(), TryInitError> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).with_target(true).finish().try_init(),
            _ => fmt().with_env_filter(filter).with_target(true).finish().try_init(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    port: u16,
    database_url: Option<String>,
    sqlite_path: Option<String>,
    survey_dir: String,
    reports_dir: String,
    db_max_connections: u32,
    strict_migrations: bool,
    log_level: String,
    log_format: String,
    render: Option<String>,
    railway_environment: Option<String>,
    fly_app_name: Option<String>,
    dyno: Option<String>,
    vercel: Option<String>,
}

impl RawSettings {
    fn hosted_platform(&self) -> Option<String> {
        let markers = [
            &self.render,
            &self.railway_environment,
            &self.fly_app_name,
            &self.dyno,
            &self.vercel,
        ];
        PLATFORM_MARKERS
            .iter()
            .zip(markers)
            .find(|(_, value)| value.is_some())
            .map(|(name, _)| name.to_string())
    }
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listener port, bound on all interfaces
    pub port: u16,
    pub database: DatabaseSettings,
    pub db_max_connections: u32,
    /// Abort startup when a migration fails
    pub strict_migrations: bool,
    pub content: ContentRoots,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Load from an environment source (tests pass an explicit map)
    pub fn from_environment(environment: config::Environment) -> Result<Self, ConfigError> {
        let raw: RawSettings = config::Config::builder()
            .set_default("port", 8000)?
            .set_default("survey_dir", "Encuestas")?
            .set_default("reports_dir", "reportes")?
            .set_default("db_max_connections", 5)?
            .set_default("strict_migrations", true)?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        let program_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Ok(Self {
            port: raw.port,
            database: DatabaseSettings {
                database_url: raw.database_url.clone(),
                sqlite_path: raw
                    .sqlite_path
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
                hosted_platform: raw.hosted_platform(),
                program_dir,
            },
            db_max_connections: raw.db_max_connections,
            strict_migrations: raw.strict_migrations,
            content: ContentRoots::new(raw.survey_dir, raw.reports_dir),
            logging: LoggingConfig {
                level: raw.log_level,
                format: raw.log_format,
            },
        })
    }

    /// Backend chosen by these settings
    pub fn database_target(&self) -> DatabaseTarget {
        DatabaseTarget::resolve(&self.database)
    }

    /// Listener address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
