//! Administrative endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use gridmap_engine::MapPatch;
use gridmap_pyramid::layout::is_safe_relative;
use gridmap_types::{CacheVersion, Coord, MapId, MapInfo, TileData};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub written: usize,
}

pub async fn rebuild_zooms(
    State(state): State<AppState>,
) -> Result<Json<RebuildResponse>, ApiError> {
    let written = state.run(|e| e.rebuild_all()).await?;
    Ok(Json(RebuildResponse { written }))
}

#[derive(Debug, Deserialize)]
pub struct TileRef {
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub zoom: u8,
}

impl TileRef {
    fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// Recompute one ancestor tile.
pub async fn rebuild_zoom(
    State(state): State<AppState>,
    Json(req): Json<TileRef>,
) -> Result<Json<TileData>, ApiError> {
    let tile = state
        .run(move |e| e.rebuild_tile(req.map, req.coord(), req.zoom))
        .await?;
    Ok(Json(tile))
}

#[derive(Debug, Deserialize)]
pub struct SaveTileRequest {
    #[serde(flatten)]
    pub tile: TileRef,
    /// Relative path under the tile root; empty records a blank tile.
    pub file: String,
    /// Minted by the server when absent.
    pub cache: Option<CacheVersion>,
}

pub async fn save_tile(
    State(state): State<AppState>,
    Json(req): Json<SaveTileRequest>,
) -> Result<Json<TileData>, ApiError> {
    if !req.file.is_empty() && !is_safe_relative(&req.file) {
        return Err(ApiError::bad_request("file must be relative to the tile root"));
    }
    let tile = state
        .run(move |e| {
            let (map, coord, zoom) = (req.tile.map, req.tile.coord(), req.tile.zoom);
            match req.cache {
                Some(cache) => e.save_tile(map, coord, zoom, &req.file, cache),
                None => e.save_tile_now(map, coord, zoom, &req.file),
            }
        })
        .await?;
    Ok(Json(tile))
}

pub async fn wipe_tile(
    State(state): State<AppState>,
    Json(req): Json<TileRef>,
) -> Result<StatusCode, ApiError> {
    state.run(move |e| e.wipe_tile(req.map, req.coord())).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_map(
    State(state): State<AppState>,
    Path(id): Path<MapId>,
    Json(patch): Json<MapPatch>,
) -> Result<Json<MapInfo>, ApiError> {
    Ok(Json(state.run(move |e| e.update_map(id, &patch)).await?))
}

#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: bool,
}

pub async fn set_default_hide(
    State(state): State<AppState>,
    Json(req): Json<SettingValue>,
) -> Result<StatusCode, ApiError> {
    let value = req.value;
    state.run(move |e| e.set_default_hidden(value)).await?;
    info!(value, "default hide changed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn wipe(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.run(|e| e.wipe_all()).await?;
    Ok(StatusCode::NO_CONTENT)
}
