//! Diagnostic routes

use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use storage::BackendInfo;

use crate::error::ApiError;
use crate::AppState;

/// Echo back a JSON body, whatever its content type
pub async fn echo(body: Bytes) -> Result<Json<Value>, ApiError> {
    let data: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;
    Ok(Json(json!({ "echo": data })))
}

/// Active storage backend
pub async fn dbinfo(State(state): State<Arc<AppState>>) -> Json<BackendInfo> {
    Json(state.repository.describe())
}
