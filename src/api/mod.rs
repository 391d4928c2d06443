// HTTP API

pub mod admin;
pub mod cam;
pub mod cameras;
mod error;
pub mod sensor;
pub mod trigger;

pub use admin::{create_admin_router, AdminAppState};
pub use cam::{create_cam_router, CamAppState};
pub use cameras::{create_camera_router, CameraAppState};
pub use error::AppError;
pub use sensor::{create_sensor_router, SensorAppState};
pub use trigger::{create_trigger_router, TriggerAppState};

use crate::monitor::HazardMonitor;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Full HTTP surface over one monitor.
pub fn create_app(monitor: Arc<HazardMonitor>, admin_token: Option<String>) -> Router {
    let thresholds = Arc::clone(monitor.detector().thresholds());
    let orchestrator = Arc::clone(monitor.orchestrator());
    let registry = Arc::clone(orchestrator.registry());
    let trigger_log = Arc::clone(monitor.trigger_log());
    let readings = Arc::clone(monitor.readings());
    let images = Arc::clone(monitor.images());

    Router::new()
        .merge(create_sensor_router(SensorAppState { monitor }))
        .merge(create_camera_router(CameraAppState { registry }))
        .merge(create_cam_router(CamAppState { readings, images }))
        .merge(create_trigger_router(TriggerAppState {
            orchestrator,
            trigger_log,
        }))
        .merge(create_admin_router(AdminAppState {
            thresholds,
            admin_token,
        }))
        .layer(CorsLayer::permissive())
}
