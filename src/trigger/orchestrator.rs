use super::{
    ActivationTransport, CallOutcome, RelayRequest, RelayRetryPolicy, TriggerAttempt,
    TriggerError, TriggerOutcome, TriggerPath, TriggerRequest,
};
use crate::registry::CameraRegistry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Turns a hazard into camera activation attempts.
///
/// Cascade, one transition per failed step:
///
/// ```text
/// DIRECT --any failure--> RELAY --transport failure + policy--> RELAY_FALLBACK
///   ^ skipped when no camera id resolves (relay chooses the camera)
/// ```
///
/// The only shared state is read access to the registry, so concurrent
/// orchestrations are independent.
pub struct TriggerOrchestrator {
    registry: Arc<CameraRegistry>,
    transport: Arc<dyn ActivationTransport>,
    default_camera_id: Option<String>,
    call_timeout: Duration,
    relay_retry: RelayRetryPolicy,
}

/// Where the cascade goes next.
enum Step {
    Direct { address: String },
    Relay,
    RelayFallback,
}

impl TriggerOrchestrator {
    pub fn new(registry: Arc<CameraRegistry>, transport: Arc<dyn ActivationTransport>) -> Self {
        Self {
            registry,
            transport,
            default_camera_id: None,
            call_timeout: Duration::from_secs(5),
            relay_retry: RelayRetryPolicy::default(),
        }
    }

    pub fn with_default_camera(mut self, camera_id: Option<String>) -> Self {
        self.default_camera_id = camera_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_relay_retry(mut self, policy: RelayRetryPolicy) -> Self {
        self.relay_retry = policy;
        self
    }

    pub fn default_camera_id(&self) -> Option<&str> {
        self.default_camera_id.as_deref()
    }

    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    /// Requested camera, or the default when none (or a blank id) is given.
    fn resolve_camera(&self, request: &TriggerRequest) -> Option<String> {
        request
            .camera_device_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.default_camera_id.clone())
    }

    /// One DIRECT call and nothing else. Used when this service is acting as
    /// the relay for another orchestrator.
    pub async fn activate_direct(
        &self,
        request: &TriggerRequest,
    ) -> Result<TriggerOutcome, TriggerError> {
        let camera_id = self.resolve_camera(request).ok_or(TriggerError::NoCamera)?;
        let record = self
            .registry
            .lookup(&camera_id)
            .ok_or_else(|| TriggerError::UnknownCamera {
                camera_device_id: camera_id.clone(),
            })?;

        let outcome = self
            .bounded(self.transport.activate_camera(&record.address, &request.reason))
            .await;
        let attempt = TriggerAttempt {
            target_device_id: Some(camera_id.clone()),
            path: TriggerPath::Direct,
            succeeded: outcome.is_success(),
            response_or_error: outcome.describe(),
            attempted_at: Utc::now(),
        };

        if !attempt.succeeded {
            warn!(
                sensor_id = %request.sensor_device_id,
                camera_id = %camera_id,
                error = %attempt.response_or_error,
                "Relayed camera activation failed"
            );
            return Err(TriggerError::AllPathsFailed {
                attempts: vec![attempt],
            });
        }

        info!(
            sensor_id = %request.sensor_device_id,
            camera_id = %camera_id,
            "Relayed camera activation succeeded"
        );
        Ok(TriggerOutcome {
            succeeded: true,
            camera_device_id: Some(camera_id),
            attempts: vec![attempt],
        })
    }

    /// Run the cascade until a path succeeds or none is left.
    pub async fn orchestrate(&self, request: &TriggerRequest) -> Result<TriggerOutcome, TriggerError> {
        let camera_id = self.resolve_camera(request);

        // Unknown camera: fail before any network call
        let first = match &camera_id {
            Some(id) => {
                let record = self.registry.lookup(id).ok_or_else(|| {
                    warn!(camera_id = %id, sensor_id = %request.sensor_device_id, "Trigger for unknown camera");
                    TriggerError::UnknownCamera {
                        camera_device_id: id.clone(),
                    }
                })?;
                Step::Direct {
                    address: record.address,
                }
            }
            None => Step::Relay,
        };

        let relay_request = RelayRequest {
            sensor_device_id: request.sensor_device_id.clone(),
            reason: request.reason.clone(),
            camera_device_id: camera_id.clone(),
        };

        let mut attempts = Vec::new();
        let mut direct_outcome: Option<CallOutcome> = None;
        let mut step = Some(first);

        while let Some(current) = step.take() {
            let (path, outcome) = match current {
                Step::Direct { address } => {
                    let outcome = self
                        .bounded(self.transport.activate_camera(&address, &request.reason))
                        .await;
                    (TriggerPath::Direct, outcome)
                }
                Step::Relay => {
                    let outcome = self
                        .bounded(self.transport.relay_activation(&relay_request))
                        .await;
                    (TriggerPath::Relay, outcome)
                }
                Step::RelayFallback => {
                    let outcome = self
                        .bounded(self.transport.relay_activation(&relay_request))
                        .await;
                    (TriggerPath::RelayFallback, outcome)
                }
            };

            let attempt = TriggerAttempt {
                target_device_id: camera_id.clone(),
                path,
                succeeded: outcome.is_success(),
                response_or_error: outcome.describe(),
                attempted_at: Utc::now(),
            };
            if attempt.succeeded {
                info!(
                    sensor_id = %request.sensor_device_id,
                    camera_id = ?camera_id,
                    path = ?path,
                    response = %attempt.response_or_error,
                    "Camera activation succeeded"
                );
            } else {
                warn!(
                    sensor_id = %request.sensor_device_id,
                    camera_id = ?camera_id,
                    path = ?path,
                    error = %attempt.response_or_error,
                    "Camera activation attempt failed"
                );
            }
            attempts.push(attempt);

            if outcome.is_success() {
                return Ok(TriggerOutcome {
                    succeeded: true,
                    camera_device_id: camera_id,
                    attempts,
                });
            }

            step = match path {
                TriggerPath::Direct => {
                    direct_outcome = Some(outcome);
                    Some(Step::Relay)
                }
                TriggerPath::Relay
                    if self
                        .relay_retry
                        .allows_fallback(direct_outcome.as_ref(), &outcome) =>
                {
                    Some(Step::RelayFallback)
                }
                TriggerPath::Relay | TriggerPath::RelayFallback => None,
            };
        }

        warn!(
            sensor_id = %request.sensor_device_id,
            camera_id = ?camera_id,
            attempts = attempts.len(),
            "All activation paths failed"
        );
        Err(TriggerError::AllPathsFailed { attempts })
    }

    /// Apply the per-call timeout; an elapsed call counts as a transport failure.
    async fn bounded<F>(&self, call: F) -> CallOutcome
    where
        F: std::future::Future<Output = CallOutcome>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => CallOutcome::Failed(format!(
                "timed out after {}s",
                self.call_timeout.as_secs_f64()
            )),
        }
    }
}
