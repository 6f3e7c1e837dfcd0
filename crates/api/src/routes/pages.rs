//! Static page and asset routes

use axum::{
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::content::{AssetDir, Page};
use crate::error::ApiError;
use crate::AppState;

async fn serve_file(path: std::path::PathBuf, request: Request) -> Response {
    debug!("Serving {}", path.display());
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

async fn serve_page(state: &AppState, page: Page, request: Request) -> Result<Response, ApiError> {
    match state.content.resolve_page(page).await {
        Some(path) => Ok(serve_file(path, request).await),
        None => {
            metrics::counter!("survey_static_not_found_total").increment(1);
            Err(ApiError::NotFound(format!("{} not found", page.file_name())))
        }
    }
}

async fn serve_asset(
    state: &AppState,
    dir: AssetDir,
    file: &str,
    request: Request,
) -> Result<Response, ApiError> {
    match state.content.resolve_asset(dir, file).await {
        Some(path) => Ok(serve_file(path, request).await),
        None => {
            metrics::counter!("survey_static_not_found_total").increment(1);
            Err(ApiError::NotFound(format!("{}/{} not found", dir.dir_name(), file)))
        }
    }
}

pub async fn comedor(State(state): State<Arc<AppState>>, request: Request) -> Result<Response, ApiError> {
    serve_page(&state, Page::Comedor, request).await
}

pub async fn transporte(State(state): State<Arc<AppState>>, request: Request) -> Result<Response, ApiError> {
    serve_page(&state, Page::Transporte, request).await
}

pub async fn reportes(State(state): State<Arc<AppState>>, request: Request) -> Result<Response, ApiError> {
    serve_page(&state, Page::Reportes, request).await
}

pub async fn assets(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    serve_asset(&state, AssetDir::Assets, &file, request).await
}

pub async fn css(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    serve_asset(&state, AssetDir::Css, &file, request).await
}

pub async fn js(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    serve_asset(&state, AssetDir::Js, &file, request).await
}
