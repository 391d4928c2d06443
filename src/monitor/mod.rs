// Ingestion pipeline: validate, persist, evaluate, and dispatch a camera
// trigger for hazards outside the per-sensor cooldown.
//
// Orchestration runs on its own task so a slow or unreachable camera never
// holds up the next reading.

use crate::config::FirewatchConfig;
use crate::detector::{HazardDecision, HazardDetector, InvalidReadingError, Reading};
use crate::registry::CameraRegistry;
use crate::store::{
    ImageStore, MemoryImageStore, MemoryReadingStore, ReadingStore, TriggerEvent, TriggerLog,
};
use crate::thresholds::ThresholdStore;
use crate::trigger::{HttpActivationClient, TriggerError, TriggerOrchestrator, TriggerRequest};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;


/// Reason tag sent with detector-initiated triggers.
pub const FIRE_HAZARD_REASON: &str = "fire_hazard";

/// What happened to the trigger side of an ingested reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerDisposition {
    /// No hazard
    NotRequired,
    /// Orchestration started in the background
    Dispatched,
    /// Hazard, but a trigger for this sensor was dispatched too recently
    Suppressed { last_dispatched_at: DateTime<Utc> },
}

/// Synchronous result of ingesting one reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub reading_id: u64,
    pub decision: HazardDecision,
    pub trigger: TriggerDisposition,
}

/// Report plus the handle of a dispatched orchestration, if any.
pub struct Ingested {
    pub report: IngestReport,
    pub dispatch: Option<JoinHandle<TriggerEvent>>,
}

pub struct HazardMonitor {
    detector: HazardDetector,
    orchestrator: Arc<TriggerOrchestrator>,
    readings: Arc<dyn ReadingStore>,
    images: Arc<dyn ImageStore>,
    trigger_log: Arc<TriggerLog>,
    /// sensor id -> observed_at of the reading that last dispatched a trigger
    last_dispatch: DashMap<String, DateTime<Utc>>,
    cooldown: Duration,
}

impl HazardMonitor {
    pub fn new(
        detector: HazardDetector,
        orchestrator: Arc<TriggerOrchestrator>,
        readings: Arc<dyn ReadingStore>,
        trigger_log: Arc<TriggerLog>,
        cooldown: Duration,
    ) -> Self {
        Self {
            detector,
            orchestrator,
            readings,
            images: Arc::new(MemoryImageStore::default()),
            trigger_log,
            last_dispatch: DashMap::new(),
            cooldown,
        }
    }

    /// Store camera captures in `images` instead of the default in-memory store.
    pub fn with_image_store(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = images;
        self
    }

    /// Wire a monitor with in-memory storage and the HTTP activation client.
    pub fn from_config(config: &FirewatchConfig) -> Result<Self> {
        let thresholds = ThresholdStore::shared(config.thresholds);
        let detector = HazardDetector::new(thresholds);

        let transport = Arc::new(
            HttpActivationClient::new(&config.trigger)
                .context("Failed to build activation client")?,
        );
        let orchestrator = TriggerOrchestrator::new(Arc::new(CameraRegistry::new()), transport)
            .with_default_camera(config.trigger.default_camera_id.clone())
            .with_call_timeout(config.trigger.call_timeout())
            .with_relay_retry(config.trigger.relay_retry);

        Ok(Self::new(
            detector,
            Arc::new(orchestrator),
            Arc::new(MemoryReadingStore::new(config.storage.max_stored_readings)),
            Arc::new(TriggerLog::new(config.storage.trigger_log_capacity)),
            config.trigger.cooldown(),
        )
        .with_image_store(Arc::new(MemoryImageStore::new(
            config.storage.max_stored_images,
        ))))
    }

    pub fn detector(&self) -> &HazardDetector {
        &self.detector
    }

    pub fn orchestrator(&self) -> &Arc<TriggerOrchestrator> {
        &self.orchestrator
    }

    pub fn readings(&self) -> &Arc<dyn ReadingStore> {
        &self.readings
    }

    pub fn images(&self) -> &Arc<dyn ImageStore> {
        &self.images
    }

    pub fn trigger_log(&self) -> &Arc<TriggerLog> {
        &self.trigger_log
    }

    /// Ingest a reading. Must be called within a tokio runtime.
    ///
    /// The reading is persisted only once it has passed validation, and the
    /// returned report never waits on the network.
    pub fn ingest(self: &Arc<Self>, reading: Reading) -> Result<Ingested, InvalidReadingError> {
        reading.validate()?;

        let decision = self.detector.evaluate(&reading)?;
        let reading_id = self.readings.append(reading.clone());

        if !decision.hazard {
            return Ok(Ingested {
                report: IngestReport {
                    reading_id,
                    decision,
                    trigger: TriggerDisposition::NotRequired,
                },
                dispatch: None,
            });
        }

        if let Some(last_dispatched_at) = self.claim_dispatch(&reading.device_id, reading.observed_at) {
            debug!(
                device_id = %reading.device_id,
                last_dispatched_at = %last_dispatched_at,
                "Hazard within trigger cooldown, not dispatching"
            );
            return Ok(Ingested {
                report: IngestReport {
                    reading_id,
                    decision,
                    trigger: TriggerDisposition::Suppressed { last_dispatched_at },
                },
                dispatch: None,
            });
        }

        let monitor = Arc::clone(self);
        let task_decision = decision.clone();
        let observed_at = reading.observed_at;
        let handle = tokio::spawn(async move { monitor.dispatch(task_decision, observed_at).await });

        Ok(Ingested {
            report: IngestReport {
                reading_id,
                decision,
                trigger: TriggerDisposition::Dispatched,
            },
            dispatch: Some(handle),
        })
    }

    /// Stamp `observed_at` as the sensor's last dispatch unless one is still
    /// cooling down, in which case the blocking stamp is returned.
    fn claim_dispatch(&self, device_id: &str, observed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.last_dispatch.entry(device_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let last = *entry.get();
                if self.cooling_down(last, observed_at) {
                    return Some(last);
                }
                entry.insert(observed_at);
                None
            }
            Entry::Vacant(entry) => {
                entry.insert(observed_at);
                None
            }
        }
    }

    fn cooling_down(&self, last: DateTime<Utc>, observed_at: DateTime<Utc>) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }
        // A reading older than the stamp is inside the cooldown
        observed_at
            .signed_duration_since(last)
            .to_std()
            .map_or(true, |elapsed| elapsed <= self.cooldown)
    }

    /// A failed trigger does not start a cooldown.
    fn release_dispatch(&self, device_id: &str, observed_at: DateTime<Utc>) {
        self.last_dispatch
            .remove_if(device_id, |_, stamp| *stamp == observed_at);
    }

    async fn dispatch(&self, decision: HazardDecision, observed_at: DateTime<Utc>) -> TriggerEvent {
        let request = TriggerRequest {
            sensor_device_id: decision.device_id.clone(),
            reason: FIRE_HAZARD_REASON.to_string(),
            camera_device_id: None,
        };

        let result = self.orchestrator.orchestrate(&request).await;

        let (succeeded, camera_device_id, attempts, error) = match result {
            Ok(outcome) => (true, outcome.camera_device_id, outcome.attempts, None),
            Err(e) => {
                self.release_dispatch(&decision.device_id, observed_at);
                let camera = match &e {
                    TriggerError::UnknownCamera { camera_device_id } => Some(camera_device_id.clone()),
                    TriggerError::NoCamera => None,
                    TriggerError::AllPathsFailed { attempts } => {
                        attempts.first().and_then(|a| a.target_device_id.clone())
                    }
                };
                (false, camera, e.attempts().to_vec(), Some(e.to_string()))
            }
        };

        let event = TriggerEvent {
            id: Uuid::now_v7().to_string(),
            sensor_device_id: decision.device_id,
            camera_device_id,
            reason: request.reason,
            hazard_reason: decision.reason,
            detail: decision.detail,
            observed_at,
            succeeded,
            error,
            attempts,
            completed_at: Utc::now(),
        };

        if event.succeeded {
            info!(
                event_id = %event.id,
                sensor_id = %event.sensor_device_id,
                attempts = event.attempts.len(),
                "Hazard trigger completed"
            );
        } else {
            error!(
                event_id = %event.id,
                sensor_id = %event.sensor_device_id,
                error = ?event.error,
                "Hazard trigger failed"
            );
        }

        self.trigger_log.record(event.clone());
        event
    }
}
