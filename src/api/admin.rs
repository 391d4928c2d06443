use super::error::AppError;
use crate::thresholds::{SharedThresholds, ThresholdUpdate, Thresholds};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::warn;

/// State for the admin API.
#[derive(Clone)]
pub struct AdminAppState {
    pub thresholds: SharedThresholds,
    /// Required bearer token for PUT /api/admin/thresholds. None = unrestricted.
    pub admin_token: Option<String>,
}

pub fn create_admin_router(state: AdminAppState) -> Router {
    Router::new()
        .route(
            "/api/admin/thresholds",
            get(get_thresholds).put(put_thresholds),
        )
        .with_state(Arc::new(state))
}

/// GET /api/admin/thresholds - returns the current thresholds.
async fn get_thresholds(State(state): State<Arc<AdminAppState>>) -> Json<Thresholds> {
    Json(state.thresholds.get())
}

/// PUT /api/admin/thresholds - partial update, applied atomically.
async fn put_thresholds(
    State(state): State<Arc<AdminAppState>>,
    headers: HeaderMap,
    Json(update): Json<ThresholdUpdate>,
) -> Result<Json<Thresholds>, AppError> {
    authorize(&headers, state.admin_token.as_deref()).inspect_err(|_| {
        warn!("Threshold update rejected: bad admin token");
    })?;

    let updated = state.thresholds.update(&update)?;
    Ok(Json(updated))
}

/// The bearer credential of a request, if it carries one.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Admit the request when no token is configured or its bearer token matches.
fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    match expected {
        None => Ok(()),
        Some(token) if bearer_token(headers) == Some(token) => Ok(()),
        Some(_) => Err(AppError::Unauthorized),
    }
}
