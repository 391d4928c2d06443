use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;


/// Last known network location of a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub device_id: String,
    /// Host, host:port or base URL the camera announced
    pub address: String,
    pub last_seen: DateTime<Utc>,
}

/// Camera registry: device_id -> last announced address.
///
/// Records are replaced whole on every registration and never expire; a stale
/// address only shows up as a failed activation. Reads and writes may race, a
/// lookup sees either the previous or the new record.
pub struct CameraRegistry {
    cameras: DashMap<String, CameraRecord>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self {
            cameras: DashMap::new(),
        }
    }

    /// Upsert a camera announcement stamped with the current time.
    pub fn register(
        &self,
        device_id: &str,
        address: &str,
    ) -> Result<CameraRecord, InvalidRegistrationError> {
        self.register_at(device_id, address, Utc::now())
    }

    /// Upsert with an explicit `last_seen`.
    pub fn register_at(
        &self,
        device_id: &str,
        address: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<CameraRecord, InvalidRegistrationError> {
        let device_id = device_id.trim();
        let address = address.trim();

        if device_id.is_empty() {
            return Err(InvalidRegistrationError::MissingDeviceId);
        }
        if address.is_empty() {
            return Err(InvalidRegistrationError::MissingAddress);
        }
        if address.chars().any(char::is_whitespace) {
            return Err(InvalidRegistrationError::MalformedAddress(address.to_string()));
        }

        let record = CameraRecord {
            device_id: device_id.to_string(),
            address: address.to_string(),
            last_seen: seen_at,
        };

        let previous = self
            .cameras
            .insert(record.device_id.clone(), record.clone());

        match previous {
            Some(old) if old.address != record.address => info!(
                device_id = %record.device_id,
                old_address = %old.address,
                address = %record.address,
                "Camera moved"
            ),
            Some(_) => {}
            None => info!(
                device_id = %record.device_id,
                address = %record.address,
                "Camera registered"
            ),
        }

        Ok(record)
    }

    /// Look up a camera by device id
    pub fn lookup(&self, device_id: &str) -> Option<CameraRecord> {
        self.cameras.get(device_id).map(|r| r.clone())
    }

    /// All known cameras, ordered by device id.
    pub fn list(&self) -> Vec<CameraRecord> {
        let mut records: Vec<CameraRecord> =
            self.cameras.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        records
    }

    pub fn count(&self) -> usize {
        self.cameras.len()
    }
}

impl Default for CameraRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected camera announcement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRegistrationError {
    #[error("device_id is required")]
    MissingDeviceId,

    #[error("address is required")]
    MissingAddress,

    #[error("address must not contain whitespace: '{0}'")]
    MalformedAddress(String),
}
