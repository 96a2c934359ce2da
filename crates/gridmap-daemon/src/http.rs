//! HTTP surface.
//!
//! Engine calls block on SQLite and image work, so every handler hands them
//! to the blocking pool through [`AppState::run`].

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gridmap_engine::{EngineError, MapEngine};
use gridmap_pyramid::PyramidError;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::handlers::{admin, client, map};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MapEngine>,
    /// Period of coalesced tile flushes on the update stream.
    pub flush_interval: Duration,
}

impl AppState {
    /// Run an engine call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&MapEngine) -> gridmap_engine::Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| ApiError::internal(&format!("engine task failed: {e}")))?
            .map_err(ApiError::from)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/client/locate", get(client::locate))
        .route("/client/gridUpdate", post(client::grid_update))
        .route("/client/gridUpload/{grid_id}", post(client::grid_upload))
        .route("/map/updates", get(map::updates))
        .route("/map/grids/{map}/{zoom}/{tile}", get(map::tile))
        .route("/map/maps", get(map::maps))
        .route("/admin/rebuildZooms", post(admin::rebuild_zooms))
        .route("/admin/rebuildZoom", post(admin::rebuild_zoom))
        .route("/admin/tiles/save", post(admin::save_tile))
        .route("/admin/wipeTile", post(admin::wipe_tile))
        .route("/admin/maps/{id}", post(admin::update_map))
        .route("/admin/settings/defaultHide", post(admin::set_default_hide))
        .route("/admin/wipe", post(admin::wipe))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Error body returned by every handler.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl ApiError {
    pub fn not_found(detail: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: detail.to_string(),
        }
    }

    pub fn bad_request(detail: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: detail.to_string(),
        }
    }

    pub fn internal(detail: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: detail.to_string(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match &e {
            EngineError::UnknownGrid(_) | EngineError::UnknownMap(_) => {
                Self::not_found(&e.to_string())
            }
            EngineError::EmptyBatch
            | EngineError::InvalidBatch(_)
            | EngineError::InvalidZoom(_)
            | EngineError::CoordOutOfRange(_)
            | EngineError::StaleCacheVersion(_)
            | EngineError::Pyramid(PyramidError::InvalidGridId(_)) => {
                Self::bad_request(&e.to_string())
            }
            _ => {
                error!("request failed: {e}");
                Self::internal(&e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
