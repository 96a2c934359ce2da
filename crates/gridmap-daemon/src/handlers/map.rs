//! Endpoints used by map viewers.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::Json;
use futures::Stream;
use gridmap_types::{Coord, MapId, MapInfo};

use crate::http::{ApiError, AppState};
use crate::stream::UpdateStream;

/// Server-push stream: snapshot, periodic tile batches, merge events.
pub async fn updates(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let sub = state.engine.subscribe();
    let snapshot = state.run(|e| e.tile_snapshot()).await?;
    let stream = UpdateStream::new(sub, snapshot, state.flush_interval).into_events();
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Parse `"{x}_{y}.png"`.
pub fn parse_tile_name(tile: &str) -> Option<Coord> {
    tile.strip_suffix(".png")?.parse().ok()
}

pub async fn tile(
    State(state): State<AppState>,
    Path((map, zoom, tile)): Path<(MapId, u8, String)>,
) -> Result<Response, ApiError> {
    let coord = parse_tile_name(&tile).ok_or_else(|| ApiError::bad_request("bad tile name"))?;
    let path = state
        .run(move |e| e.tile_path(map, coord, zoom))
        .await?
        .ok_or_else(|| ApiError::not_found("file not found"))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    let mut resp = Response::new(bytes.into());
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private immutable"),
    );
    Ok(resp)
}

/// Maps visible to viewers.
pub async fn maps(State(state): State<AppState>) -> Result<Json<Vec<MapInfo>>, ApiError> {
    Ok(Json(state.run(|e| e.list_maps(false)).await?))
}
