use super::error::AppError;
use crate::store::{ImageFilter, ImageStore, NewImage, ReadingStore, StoredImage};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Device id recorded when an upload does not name its camera.
pub const UNKNOWN_DEVICE: &str = "unknown_device";

/// State for the camera image API.
#[derive(Clone)]
pub struct CamAppState {
    pub readings: Arc<dyn ReadingStore>,
    pub images: Arc<dyn ImageStore>,
}

#[derive(Deserialize)]
struct CamPayload {
    device_id: Option<String>,
    /// Base64-encoded JPEG
    image: Option<String>,
    sensor_data_id: Option<u64>,
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    image_id: u64,
}

pub fn create_cam_router(state: CamAppState) -> Router {
    Router::new()
        .route("/api/cam", get(list_images).post(upload_image))
        .with_state(Arc::new(state))
}

/// POST /api/cam - Store a capture, optionally linked to the reading that caused it
async fn upload_image(
    State(state): State<Arc<CamAppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let payload = serde_json::from_slice::<CamPayload>(&body).map_err(|e| {
        debug!(error = %e, "Rejected malformed image upload");
        AppError::ValidationError("Invalid data format".to_string())
    })?;

    let encoded = payload
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| AppError::ValidationError("No image data provided".to_string()))?;

    if let Some(id) = payload.sensor_data_id {
        if state.readings.get(id).is_none() {
            return Err(AppError::NotFound("Sensor data not found".to_string()));
        }
    }

    // Camera firmware may wrap long base64 lines
    let compact: String = encoded.split_ascii_whitespace().collect();
    let data = STANDARD
        .decode(compact)
        .map_err(|e| AppError::ValidationError(format!("Invalid image encoding: {}", e)))?;

    let device_id = payload
        .device_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string());

    let stored = state.images.append(NewImage {
        device_id,
        sensor_data_id: payload.sensor_data_id,
        data,
    });
    info!(
        image_id = stored.id,
        device_id = %stored.device_id,
        sensor_data_id = ?stored.sensor_data_id,
        size_bytes = stored.size_bytes,
        "Image stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image stored successfully!",
            image_id: stored.id,
        }),
    ))
}

/// GET /api/cam - Image metadata, newest first
///
/// Query parameters:
/// - `device_id`: only this camera
/// - `sensor_data_id`: only captures linked to this reading
/// - `limit`: maximum rows (default 10)
async fn list_images(
    State(state): State<Arc<CamAppState>>,
    Query(filter): Query<ImageFilter>,
) -> Json<Vec<StoredImage>> {
    Json(state.images.query(&filter))
}
