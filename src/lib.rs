// Hazard thresholds shared by every evaluation
pub mod thresholds;

// Per-device temperature windows and hazard evaluation
pub mod detector;

// Camera device registry
pub mod registry;

// Camera activation cascade
pub mod trigger;

// Reading and image persistence, trigger audit log
pub mod store;

// Ingestion pipeline and trigger cooldown
pub mod monitor;

// Configuration
pub mod config;

// HTTP API
pub mod api;
