use super::error::AppError;
use crate::detector::Reading;
use crate::monitor::{HazardMonitor, IngestReport};
use crate::store::{ReadingFilter, StoredReading};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// State for the sensor API.
#[derive(Clone)]
pub struct SensorAppState {
    pub monitor: Arc<HazardMonitor>,
}

/// Inbound reading. Every measurement is required; `observed_at` defaults to
/// the time of receipt.
#[derive(Deserialize)]
struct SensorPayload {
    device_id: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    #[serde(alias = "timestamp")]
    observed_at: Option<DateTime<Utc>>,
}

impl SensorPayload {
    fn into_reading(self) -> Option<Reading> {
        Some(Reading {
            device_id: self.device_id?,
            temperature: self.temperature?,
            humidity: self.humidity?,
            pressure: self.pressure?,
            observed_at: self.observed_at.unwrap_or_else(Utc::now),
        })
    }
}

pub fn create_sensor_router(state: SensorAppState) -> Router {
    Router::new()
        .route("/api/sensor", get(list_readings).post(ingest_reading))
        .with_state(Arc::new(state))
}

/// POST /api/sensor - Ingest one reading, evaluate it and dispatch a trigger on hazard
async fn ingest_reading(
    State(state): State<Arc<SensorAppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestReport>), AppError> {
    let reading = serde_json::from_slice::<SensorPayload>(&body)
        .ok()
        .and_then(SensorPayload::into_reading)
        .ok_or_else(|| {
            debug!("Rejected malformed sensor payload");
            AppError::ValidationError("Invalid data".to_string())
        })?;

    let ingested = state.monitor.ingest(reading).map_err(|e| {
        warn!(error = %e, "Invalid reading");
        AppError::from(e)
    })?;

    // Orchestration keeps running in the background
    drop(ingested.dispatch);

    Ok((StatusCode::CREATED, Json(ingested.report)))
}

/// GET /api/sensor - Stored readings, newest first
///
/// Query parameters:
/// - `device_id`: only this sensor
/// - `limit`: maximum rows (default 10)
async fn list_readings(
    State(state): State<Arc<SensorAppState>>,
    Query(filter): Query<ReadingFilter>,
) -> Json<Vec<StoredReading>> {
    Json(state.monitor.readings().query(&filter))
}
