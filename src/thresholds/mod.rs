// Hazard thresholds shared by every evaluation.
//
// The store hands out copies of a single `Thresholds` value. Updates build the
// complete replacement first and swap the pointer, so a reader sees either the
// whole old value or the whole new one and never waits on a writer.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[cfg(test)]
mod tests;

/// Tunable hazard parameters. Missing fields deserialize to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Temperature at or above which a reading is a hazard on its own
    pub abs_threshold: f64,
    /// Rise over the window (current minus oldest) that counts as a hazard
    pub rise_threshold: f64,
    /// Sliding span of history considered by the rise check
    #[serde(rename = "window_duration_secs", with = "duration_secs")]
    pub window_duration: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            abs_threshold: 35.0,
            rise_threshold: 5.0,
            window_duration: Duration::from_secs(60),
        }
    }
}

impl Thresholds {
    /// Check the numeric fields are finite and non-negative.
    pub fn validate(&self) -> Result<(), InvalidThresholdError> {
        check_field("abs_threshold", self.abs_threshold)?;
        check_field("rise_threshold", self.rise_threshold)?;
        Ok(())
    }
}

/// Partial update body. Only fields present are changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdUpdate {
    pub abs_threshold: Option<f64>,
    pub rise_threshold: Option<f64>,
    pub window_duration_secs: Option<f64>,
}

/// Rejected threshold update. The store is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidThresholdError {
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

fn check_field(field: &'static str, value: f64) -> Result<f64, InvalidThresholdError> {
    if !value.is_finite() {
        return Err(InvalidThresholdError::NotFinite { field, value });
    }
    if value < 0.0 {
        return Err(InvalidThresholdError::Negative { field, value });
    }
    Ok(value)
}

/// Process-wide threshold store.
///
/// Reads are a lock-free pointer load. Writers replace the whole value.
pub struct ThresholdStore {
    current: ArcSwap<Thresholds>,
}

pub type SharedThresholds = Arc<ThresholdStore>;

/// Update fields that passed validation.
#[derive(Debug, Clone, Copy)]
struct CheckedUpdate {
    abs_threshold: Option<f64>,
    rise_threshold: Option<f64>,
    window_duration: Option<Duration>,
}

impl CheckedUpdate {
    fn check(update: &ThresholdUpdate) -> Result<Self, InvalidThresholdError> {
        let abs_threshold = update
            .abs_threshold
            .map(|v| check_field("abs_threshold", v))
            .transpose()?;
        let rise_threshold = update
            .rise_threshold
            .map(|v| check_field("rise_threshold", v))
            .transpose()?;
        let window_duration = update
            .window_duration_secs
            .map(|v| {
                let secs = check_field("window_duration_secs", v)?;
                Duration::try_from_secs_f64(secs).map_err(|_| InvalidThresholdError::OutOfRange {
                    field: "window_duration_secs",
                    value: secs,
                })
            })
            .transpose()?;
        Ok(Self {
            abs_threshold,
            rise_threshold,
            window_duration,
        })
    }

    fn apply_to(&self, current: &Thresholds) -> Thresholds {
        Thresholds {
            abs_threshold: self.abs_threshold.unwrap_or(current.abs_threshold),
            rise_threshold: self.rise_threshold.unwrap_or(current.rise_threshold),
            window_duration: self.window_duration.unwrap_or(current.window_duration),
        }
    }
}

impl ThresholdStore {
    pub fn new(initial: Thresholds) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn shared(initial: Thresholds) -> SharedThresholds {
        Arc::new(Self::new(initial))
    }

    /// Latest fully committed thresholds.
    pub fn get(&self) -> Thresholds {
        **self.current.load()
    }

    /// Apply a partial update atomically and return the committed value.
    ///
    /// Every supplied field is validated before anything is swapped; on error
    /// nothing is written. Concurrent partial updates each land on top of the
    /// other's result.
    pub fn update(&self, update: &ThresholdUpdate) -> Result<Thresholds, InvalidThresholdError> {
        let checked = CheckedUpdate::check(update)?;

        let previous = self
            .current
            .rcu(|current| Arc::new(checked.apply_to(current)));
        let next = checked.apply_to(&previous);

        info!(
            abs_threshold = next.abs_threshold,
            rise_threshold = next.rise_threshold,
            window_secs = next.window_duration.as_secs_f64(),
            "Thresholds updated"
        );
        Ok(next)
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

/// Serde helper: `Duration` as fractional seconds.
pub(crate) mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
