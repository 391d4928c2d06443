use super::error::AppError;
use crate::store::{TriggerEvent, TriggerLog, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
use crate::trigger::{RelayRequest, TriggerOrchestrator, TriggerOutcome, TriggerRequest};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// State for the trigger API.
#[derive(Clone)]
pub struct TriggerAppState {
    pub orchestrator: Arc<TriggerOrchestrator>,
    pub trigger_log: Arc<TriggerLog>,
}

#[derive(Deserialize)]
struct TriggerLogParams {
    limit: Option<usize>,
}

pub fn create_trigger_router(state: TriggerAppState) -> Router {
    Router::new()
        .route("/api/orchestrate", post(orchestrate))
        .route("/api/trigger_camera", post(relay_trigger))
        .route("/api/triggers", get(list_triggers))
        .with_state(Arc::new(state))
}

/// POST /api/orchestrate - Run the full activation cascade and wait for the result
async fn orchestrate(
    State(state): State<Arc<TriggerAppState>>,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<TriggerOutcome>, AppError> {
    if request.sensor_device_id.trim().is_empty() {
        return Err(AppError::ValidationError(
            "sensor_device_id is required".to_string(),
        ));
    }

    info!(
        sensor_id = %request.sensor_device_id,
        reason = %request.reason,
        camera_id = ?request.camera_device_id,
        "Orchestration requested"
    );
    let outcome = state.orchestrator.orchestrate(&request).await?;
    Ok(Json(outcome))
}

/// POST /api/trigger_camera - Relay endpoint: one direct activation on behalf of a caller
async fn relay_trigger(
    State(state): State<Arc<TriggerAppState>>,
    Json(request): Json<RelayRequest>,
) -> Result<Json<TriggerOutcome>, AppError> {
    info!(
        sensor_id = %request.sensor_device_id,
        reason = %request.reason,
        camera_id = ?request.camera_device_id,
        "Relay activation requested"
    );
    let request = TriggerRequest {
        sensor_device_id: request.sensor_device_id,
        reason: request.reason,
        camera_device_id: request.camera_device_id,
    };
    let outcome = state.orchestrator.activate_direct(&request).await?;
    Ok(Json(outcome))
}

/// GET /api/triggers - Trigger audit log, newest first
async fn list_triggers(
    State(state): State<Arc<TriggerAppState>>,
    Query(params): Query<TriggerLogParams>,
) -> Json<Vec<TriggerEvent>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_QUERY_LIMIT)
        .min(MAX_QUERY_LIMIT);
    Json(state.trigger_log.recent(limit))
}
