// Integration tests for camera image upload and listing

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use firewatch::api::create_app;
use firewatch::config::FirewatchConfig;
use firewatch::monitor::HazardMonitor;
use firewatch::store::ImageFilter;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const JPEG_HEADER: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

fn create_test_app() -> (Router, Arc<HazardMonitor>) {
    let monitor = Arc::new(HazardMonitor::from_config(&FirewatchConfig::default()).unwrap());
    (create_app(Arc::clone(&monitor), None), monitor)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Store one reading and return its id.
async fn post_reading(app: &Router) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/sensor",
        Some(json!({
            "device_id": "sensor_device_1",
            "temperature": 24.0,
            "humidity": 41.0,
            "pressure": 1012.3,
            "observed_at": "2026-03-01T12:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["reading_id"].as_u64().unwrap()
}

fn upload(device_id: &str, sensor_data_id: Option<u64>) -> serde_json::Value {
    let mut body = json!({
        "device_id": device_id,
        "image": STANDARD.encode(JPEG_HEADER),
    });
    if let Some(id) = sensor_data_id {
        body["sensor_data_id"] = json!(id);
    }
    body
}

#[tokio::test]
async fn test_upload_linked_to_reading() {
    let (app, monitor) = create_test_app();
    let reading_id = post_reading(&app).await;

    let (status, body) = send(&app, "POST", "/api/cam", Some(upload("camera_1", Some(reading_id)))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Image stored successfully!");
    let image_id = body["image_id"].as_u64().unwrap();

    // Decoded bytes are what the store keeps
    let stored = monitor.images().query(&ImageFilter::default());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, image_id);
    assert_eq!(stored[0].data, JPEG_HEADER.to_vec());
    assert_eq!(stored[0].sensor_data_id, Some(reading_id));
}

#[tokio::test]
async fn test_upload_unknown_reading_returns_404() {
    let (app, monitor) = create_test_app();

    let (status, body) = send(&app, "POST", "/api/cam", Some(upload("camera_1", Some(42)))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Sensor data not found");
    assert!(monitor.images().query(&ImageFilter::default()).is_empty());
}

#[tokio::test]
async fn test_upload_without_image_returns_400() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "POST", "/api/cam", Some(json!({ "device_id": "camera_1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image data provided");

    let (status, _) = send(
        &app,
        "POST",
        "/api/cam",
        Some(json!({ "device_id": "camera_1", "image": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/cam",
        Some(json!({ "device_id": "camera_1", "image": "not base64!" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid image encoding"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/cam")
                .header("Content-Type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Wrapped base64 and a missing device id are both accepted.
#[tokio::test]
async fn test_upload_defaults_device_and_ignores_line_breaks() {
    let (app, _) = create_test_app();
    let encoded = STANDARD.encode(JPEG_HEADER);
    let wrapped = format!("{}\n{}", &encoded[..4], &encoded[4..]);

    let (status, _) = send(&app, "POST", "/api/cam", Some(json!({ "image": wrapped }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, images) = send(&app, "GET", "/api/cam", None).await;
    assert_eq!(images[0]["device_id"], "unknown_device");
    assert_eq!(images[0]["size_bytes"], JPEG_HEADER.len());
}

#[tokio::test]
async fn test_list_images_filtered_newest_first() {
    let (app, _) = create_test_app();
    let reading_id = post_reading(&app).await;

    let (_, first) = send(&app, "POST", "/api/cam", Some(upload("camera_1", Some(reading_id)))).await;
    let (_, second) = send(&app, "POST", "/api/cam", Some(upload("camera_2", None))).await;
    let (_, third) = send(&app, "POST", "/api/cam", Some(upload("camera_1", None))).await;

    let ids = |rows: &serde_json::Value| -> Vec<u64> {
        rows.as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect()
    };

    let (status, all) = send(&app, "GET", "/api/cam", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&all),
        vec![
            third["image_id"].as_u64().unwrap(),
            second["image_id"].as_u64().unwrap(),
            first["image_id"].as_u64().unwrap(),
        ]
    );
    // Metadata only
    assert!(all[0].get("data").is_none());
    assert!(all[0]["filename"].as_str().unwrap().ends_with(".jpg"));

    let (_, camera_1) = send(&app, "GET", "/api/cam?device_id=camera_1&limit=1", None).await;
    assert_eq!(ids(&camera_1), vec![third["image_id"].as_u64().unwrap()]);

    let (_, linked) = send(
        &app,
        "GET",
        &format!("/api/cam?sensor_data_id={}", reading_id),
        None,
    )
    .await;
    assert_eq!(ids(&linked), vec![first["image_id"].as_u64().unwrap()]);
    assert_eq!(linked[0]["sensor_data_id"], reading_id);
}
