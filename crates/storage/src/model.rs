//! Stored records and query filters

use crate::StorageError;
use chrono::{DateTime, Utc};
use data_validator::{Kind, Rating, ValidatedSubmission};
use serde::Serialize;
use serde_json::Value;

/// Format a timestamp as stored: UTC, whole seconds, trailing `Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// A response ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    pub created_at: String,
    pub site: String,
    pub device_id: String,
    pub rating: Rating,
    pub reason: String,
    /// Serialized JSON metadata
    pub meta: String,
    pub kind: Kind,
}

impl NewResponse {
    /// Stamp a validated submission with the insertion time
    pub fn from_submission(
        submission: ValidatedSubmission,
        now: DateTime<Utc>,
    ) -> Result<Self, StorageError> {
        let meta = serde_json::to_string(&submission.meta)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        Ok(Self {
            created_at: format_timestamp(now),
            site: submission.site,
            device_id: submission.device_id,
            rating: submission.rating,
            reason: submission.reason,
            meta,
            kind: submission.kind,
        })
    }
}

/// A persisted response row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredResponse {
    pub id: i64,
    pub created_at: String,
    pub sede: Option<String>,
    pub dispositivo_id: Option<String>,
    pub calificacion: String,
    pub motivo: String,
    pub meta: Option<String>,
    pub tipo: String,
}

impl StoredResponse {
    /// Decode the stored metadata; text that is not JSON is returned as a string
    pub fn meta_json(&self) -> Value {
        match self.meta.as_deref() {
            None | Some("") => Value::Object(Default::default()),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        }
    }
}

/// Count of responses for one (day, kind, rating) group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SummaryRow {
    pub dia: String,
    pub tipo: String,
    pub calificacion: String,
    pub n: i64,
}

/// Filters shared by listing and summarizing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    pub kind: Option<Kind>,
    /// Inclusive lower bound on the `YYYY-MM-DD` date prefix
    pub from: Option<String>,
    /// Inclusive upper bound on the `YYYY-MM-DD` date prefix
    pub to: Option<String>,
}

impl ResponseFilter {
    /// Build a filter from raw query parameters. Values are trimmed, blanks
    /// are dropped, and a kind other than comedor/transporte is ignored.
    pub fn from_params(tipo: Option<&str>, desde: Option<&str>, hasta: Option<&str>) -> Self {
        fn non_blank(raw: Option<&str>) -> Option<String> {
            raw.map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        }

        Self {
            kind: tipo.and_then(Kind::parse_known),
            from: non_blank(desde),
            to: non_blank(hasta),
        }
    }
}

/// Description of the active backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    pub engine: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
