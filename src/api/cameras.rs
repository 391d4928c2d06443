use super::error::AppError;
use crate::registry::{CameraRecord, CameraRegistry};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// State for the camera registry API.
#[derive(Clone)]
pub struct CameraAppState {
    pub registry: Arc<CameraRegistry>,
}

/// Camera announcement
#[derive(Deserialize)]
struct CameraAnnouncement {
    #[serde(default)]
    device_id: String,
    #[serde(default)]
    ip_address: String,
}

#[derive(Serialize)]
struct CameraResponse {
    device_id: String,
    ip_address: String,
    last_seen: DateTime<Utc>,
}

impl From<CameraRecord> for CameraResponse {
    fn from(record: CameraRecord) -> Self {
        Self {
            device_id: record.device_id,
            ip_address: record.address,
            last_seen: record.last_seen,
        }
    }
}

pub fn create_camera_router(state: CameraAppState) -> Router {
    Router::new()
        .route(
            "/api/devices/camera",
            get(list_cameras).post(register_camera),
        )
        .route("/api/devices/camera/:device_id", get(get_camera))
        .with_state(Arc::new(state))
}

/// POST /api/devices/camera - Register or move a camera
async fn register_camera(
    State(state): State<Arc<CameraAppState>>,
    Json(announcement): Json<CameraAnnouncement>,
) -> Result<Json<CameraResponse>, AppError> {
    let record = state
        .registry
        .register(&announcement.device_id, &announcement.ip_address)?;
    Ok(Json(record.into()))
}

/// GET /api/devices/camera - All known cameras, sorted by id
async fn list_cameras(State(state): State<Arc<CameraAppState>>) -> Json<Vec<CameraResponse>> {
    Json(state.registry.list().into_iter().map(Into::into).collect())
}

/// GET /api/devices/camera/:device_id
async fn get_camera(
    State(state): State<Arc<CameraAppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<CameraResponse>, AppError> {
    state
        .registry
        .lookup(&device_id)
        .map(|record| Json(record.into()))
        .ok_or_else(|| AppError::NotFound(format!("Camera not found: {}", device_id)))
}
