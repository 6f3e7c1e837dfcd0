//! Survey response routes

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use data_validator::{Kind, Submission};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use storage::{NewResponse, StoredResponse};
use tracing::{info, warn};

use super::FilterQuery;
use crate::error::ApiError;
use crate::AppState;

/// Body returned after recording a response
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub created_at: String,
    pub tipo: Kind,
}

/// A stored response as listed by the reports page
#[derive(Debug, Serialize)]
pub struct ResponseRecord {
    pub id: i64,
    pub created_at: String,
    pub sede: Option<String>,
    pub dispositivo_id: Option<String>,
    pub calificacion: String,
    pub motivo: String,
    pub meta: Value,
    pub tipo: String,
}

impl From<StoredResponse> for ResponseRecord {
    fn from(row: StoredResponse) -> Self {
        let meta = row.meta_json();
        Self {
            id: row.id,
            created_at: row.created_at,
            sede: row.sede,
            dispositivo_id: row.dispositivo_id,
            calificacion: row.calificacion,
            motivo: row.motivo,
            meta,
            tipo: row.tipo,
        }
    }
}

/// Decode a submission body. A JSON `null` counts as an empty submission.
fn parse_submission(body: &[u8]) -> Result<Submission, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;
    if value.is_null() {
        return Ok(Submission::default());
    }
    serde_json::from_value(value).map_err(|e| ApiError::MalformedPayload(e.to_string()))
}

/// Validate and record one survey response
pub async fn create_response(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let submission = parse_submission(&body)?;

    let validated = state.validator.validate(submission).map_err(|err| {
        warn!("Rejected submission: {}", err);
        metrics::counter!("survey_responses_rejected_total", "reason" => err.reason()).increment(1);
        err
    })?;

    let response = NewResponse::from_submission(validated, Utc::now())?;
    let id = state.repository.insert(&response).await?;

    metrics::counter!(
        "survey_responses_recorded_total",
        "tipo" => response.kind.as_str(),
        "calificacion" => response.rating.as_str()
    )
    .increment(1);
    info!(id, tipo = %response.kind, calificacion = %response.rating, "Recorded response");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            created_at: response.created_at,
            tipo: response.kind,
        }),
    ))
}

/// List stored responses, newest first
pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ResponseRecord>>, ApiError> {
    let filter = FilterQuery::from_pairs(pairs).to_filter();
    let rows = state.repository.list(&filter).await?;
    Ok(Json(rows.into_iter().map(ResponseRecord::from).collect()))
}
