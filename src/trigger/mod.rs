// Camera activation with fallback paths.
//
// DIRECT calls the camera at its registered address. RELAY asks a secondary
// service to activate the camera on our behalf. RELAY_FALLBACK repeats the
// relay call once, only in the narrow case selected by `RelayRetryPolicy`.

mod orchestrator;
mod transport;

pub use orchestrator::TriggerOrchestrator;
pub use transport::{ActivationTransport, HttpActivationClient, RelayRequest};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;


/// One route for reaching the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerPath {
    Direct,
    Relay,
    RelayFallback,
}

/// Result of a single outbound activation call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// 2xx from the callee
    Accepted { status: u16, body: String },
    /// The callee answered with a non-success status
    Rejected { status: u16, body: String },
    /// Timeout, connection or protocol error; no usable answer
    Failed(String),
    /// The path cannot be attempted with the current configuration
    Unavailable(String),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Accepted { .. })
    }

    /// True when the call errored out rather than being answered.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, CallOutcome::Failed(_))
    }

    fn describe(&self) -> String {
        match self {
            CallOutcome::Accepted { status, body } | CallOutcome::Rejected { status, body } => {
                if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    format!("HTTP {}: {}", status, body)
                }
            }
            CallOutcome::Failed(e) => e.clone(),
            CallOutcome::Unavailable(e) => e.clone(),
        }
    }
}

/// Log entry for one path tried during an orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerAttempt {
    /// Camera being activated; None when the relay was left to choose
    pub target_device_id: Option<String>,
    pub path: TriggerPath,
    pub succeeded: bool,
    pub response_or_error: String,
    pub attempted_at: DateTime<Utc>,
}

/// Input to `TriggerOrchestrator::orchestrate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub sensor_device_id: String,
    /// Free-form tag, e.g. "fire_hazard"
    pub reason: String,
    /// Falls back to the configured default camera when omitted
    #[serde(default)]
    pub camera_device_id: Option<String>,
}

/// Successful orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerOutcome {
    pub succeeded: bool,
    pub camera_device_id: Option<String>,
    pub attempts: Vec<TriggerAttempt>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TriggerError {
    /// Nothing was attempted.
    #[error("unknown camera '{camera_device_id}'")]
    UnknownCamera { camera_device_id: String },

    /// No camera id given and no default configured; only for single-path
    /// activation, the cascade hands this case to the relay.
    #[error("no camera_device_id given and no default camera configured")]
    NoCamera,

    /// Every path in the cascade was tried and none succeeded.
    #[error("all activation paths failed after {} attempt(s)", .attempts.len())]
    AllPathsFailed { attempts: Vec<TriggerAttempt> },
}

impl TriggerError {
    /// Attempt log carried by the error; empty when nothing was attempted.
    pub fn attempts(&self) -> &[TriggerAttempt] {
        match self {
            TriggerError::UnknownCamera { .. } | TriggerError::NoCamera => &[],
            TriggerError::AllPathsFailed { attempts } => attempts,
        }
    }
}

/// When RELAY_FALLBACK is taken after a relay transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayRetryPolicy {
    /// Only if DIRECT was also attempted and errored out (not merely non-2xx)
    #[default]
    AfterDirectError,
    /// After any relay transport failure
    OnRelayError,
    Never,
}

impl RelayRetryPolicy {
    pub(crate) fn allows_fallback(self, direct: Option<&CallOutcome>, relay: &CallOutcome) -> bool {
        if !relay.is_transport_failure() {
            return false;
        }
        match self {
            RelayRetryPolicy::AfterDirectError => {
                direct.map_or(false, CallOutcome::is_transport_failure)
            }
            RelayRetryPolicy::OnRelayError => true,
            RelayRetryPolicy::Never => false,
        }
    }
}

/// Trigger configuration (`[trigger]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    /// Full URL of the relay activation endpoint
    pub relay_url: Option<String>,
    /// Camera used when a request names none
    pub default_camera_id: Option<String>,
    /// Path appended to a camera's address for DIRECT calls
    pub activation_path: String,
    /// Upper bound on every outbound call
    pub call_timeout_secs: u64,
    /// Minimum spacing between dispatched triggers for one sensor
    pub cooldown_secs: u64,
    pub relay_retry: RelayRetryPolicy,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            relay_url: None,
            default_camera_id: None,
            activation_path: "/firehazard".to_string(),
            call_timeout_secs: 5,
            cooldown_secs: 60,
            relay_retry: RelayRetryPolicy::default(),
        }
    }
}

impl TriggerSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}
