//! Aggregated report route

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use storage::SummaryRow;

use super::FilterQuery;
use crate::error::ApiError;
use crate::AppState;

/// Counts per day, kind and rating
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<SummaryRow>>, ApiError> {
    let filter = FilterQuery::from_pairs(pairs).to_filter();
    let rows = state.repository.summarize(&filter).await?;
    Ok(Json(rows))
}
