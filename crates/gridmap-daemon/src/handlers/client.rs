//! Endpoints used by game clients.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use gridmap_engine::{BatchRequest, GridRequest, UploadOutcome};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct LocateQuery {
    #[serde(rename = "gridID")]
    pub grid_id: String,
}

/// `"{map};{x};{y}"` for a known fragment.
pub async fn locate(
    State(state): State<AppState>,
    Query(query): Query<LocateQuery>,
) -> Result<String, ApiError> {
    let (map, coord) = state.run(move |e| e.locate(&query.grid_id)).await?;
    Ok(format!("{map};{};{}", coord.x, coord.y))
}

pub async fn grid_update(
    State(state): State<AppState>,
    Json(batch): Json<BatchRequest>,
) -> Result<Json<GridRequest>, ApiError> {
    let resp = state.run(move |e| e.register_batch(&batch)).await?;
    debug!(map = resp.map, requests = resp.grid_requests.len(), "grid update");
    Ok(Json(resp))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub stored: bool,
}

/// Raw PNG body for one fragment.
pub async fn grid_upload(
    State(state): State<AppState>,
    Path(grid_id): Path<String>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("empty upload"));
    }
    let outcome = state.run(move |e| e.upload_grid(&grid_id, &body)).await?;
    Ok(Json(UploadResponse {
        stored: matches!(outcome, UploadOutcome::Stored { .. }),
    }))
}
