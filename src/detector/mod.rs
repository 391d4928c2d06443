// Signal-based fire hazard detection.
//
// Each device owns a sliding temperature window. A reading is a hazard when it
// crosses the absolute threshold, or when it has risen by at least the rise
// threshold over the oldest reading still inside the window.

mod window;

pub use window::{Sample, TemperatureWindow};

use crate::thresholds::{SharedThresholds, Thresholds};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};


/// One environmental reading from a sensor node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    /// Full validation of a reading at the ingestion boundary.
    pub fn validate(&self) -> Result<(), InvalidReadingError> {
        self.validate_for_detection()?;
        check_finite("humidity", self.humidity)?;
        check_finite("pressure", self.pressure)?;
        Ok(())
    }

    /// The subset the detector needs: a device id and a usable temperature.
    fn validate_for_detection(&self) -> Result<(), InvalidReadingError> {
        if self.device_id.trim().is_empty() {
            return Err(InvalidReadingError::MissingDeviceId);
        }
        check_finite("temperature", self.temperature)
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), InvalidReadingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InvalidReadingError::NonFinite { field, value })
    }
}

/// Malformed reading. The device window is not touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidReadingError {
    #[error("device_id is required")]
    MissingDeviceId,

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// Why a reading was (or was not) flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HazardReason {
    None,
    AbsThreshold,
    RapidRise,
}

/// Outcome of evaluating one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDecision {
    pub device_id: String,
    pub hazard: bool,
    pub reason: HazardReason,
    pub detail: String,
}

/// Per-device windows plus the shared thresholds.
///
/// The window map entry is held for the whole append-and-check step, so a
/// device's window is mutated by one evaluation at a time while other devices
/// proceed independently. Evaluation never performs I/O.
pub struct HazardDetector {
    windows: DashMap<String, TemperatureWindow>,
    thresholds: SharedThresholds,
}

impl HazardDetector {
    pub fn new(thresholds: SharedThresholds) -> Self {
        Self {
            windows: DashMap::new(),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &SharedThresholds {
        &self.thresholds
    }

    /// Fold a reading into its device window and decide whether it is a hazard.
    pub fn evaluate(&self, reading: &Reading) -> Result<HazardDecision, InvalidReadingError> {
        reading.validate_for_detection()?;

        // One snapshot per evaluation
        let thresholds = self.thresholds.get();
        let current = reading.temperature;

        let (oldest, len) = {
            let mut window = self
                .windows
                .entry(reading.device_id.clone())
                .or_default();
            window.push(
                Sample {
                    observed_at: reading.observed_at,
                    temperature: current,
                },
                thresholds.window_duration,
            );
            (window.oldest().copied(), window.len())
        };

        let abs_hit = current >= thresholds.abs_threshold;
        let rise = match oldest {
            Some(oldest) if len >= 2 && current - oldest.temperature >= thresholds.rise_threshold => {
                Some(oldest)
            }
            _ => None,
        };

        let decision = match (abs_hit, rise) {
            (true, rise) => {
                let mut detail = abs_detail(current, &thresholds);
                if let Some(oldest) = rise {
                    detail.push_str("; ");
                    detail.push_str(&rise_detail(&oldest, current, &thresholds));
                }
                HazardDecision {
                    device_id: reading.device_id.clone(),
                    hazard: true,
                    reason: HazardReason::AbsThreshold,
                    detail,
                }
            }
            (false, Some(oldest)) => HazardDecision {
                device_id: reading.device_id.clone(),
                hazard: true,
                reason: HazardReason::RapidRise,
                detail: rise_detail(&oldest, current, &thresholds),
            },
            (false, None) => HazardDecision {
                device_id: reading.device_id.clone(),
                hazard: false,
                reason: HazardReason::None,
                detail: format!(
                    "temperature {} below abs_threshold {}, no rise of {} within {}s",
                    current,
                    thresholds.abs_threshold,
                    thresholds.rise_threshold,
                    thresholds.window_duration.as_secs_f64()
                ),
            },
        };

        if decision.hazard {
            warn!(
                device_id = %decision.device_id,
                reason = ?decision.reason,
                detail = %decision.detail,
                "Fire hazard detected"
            );
        } else {
            debug!(device_id = %decision.device_id, temperature = current, window_len = len, "Reading within thresholds");
        }

        Ok(decision)
    }

    /// Copy of a device's current window, oldest first. Empty if unseen.
    pub fn window_snapshot(&self, device_id: &str) -> Vec<Sample> {
        self.windows
            .get(device_id)
            .map(|w| w.samples().copied().collect())
            .unwrap_or_default()
    }

    /// Number of devices with a window.
    pub fn device_count(&self) -> usize {
        self.windows.len()
    }
}

fn abs_detail(current: f64, thresholds: &Thresholds) -> String {
    format!(
        "temperature {} >= abs_threshold {}",
        current, thresholds.abs_threshold
    )
}

fn rise_detail(oldest: &Sample, current: f64, thresholds: &Thresholds) -> String {
    format!(
        "rise {} -> {} (+{:.2}) >= rise_threshold {} within {}s window (oldest at {})",
        oldest.temperature,
        current,
        current - oldest.temperature,
        thresholds.rise_threshold,
        thresholds.window_duration.as_secs_f64(),
        oldest.observed_at.to_rfc3339()
    )
}
