use crate::detector::HazardReason;
use crate::trigger::TriggerAttempt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Audit record for one dispatched orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// UUIDv7, time-ordered
    pub id: String,
    pub sensor_device_id: String,
    pub camera_device_id: Option<String>,
    pub reason: String,
    pub hazard_reason: HazardReason,
    pub detail: String,
    /// Timestamp of the reading that raised the hazard
    pub observed_at: DateTime<Utc>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<TriggerAttempt>,
    pub completed_at: DateTime<Utc>,
}

/// Bounded in-memory log of trigger events, oldest evicted first.
pub struct TriggerLog {
    events: Mutex<VecDeque<TriggerEvent>>,
    capacity: usize,
}

impl TriggerLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, event: TriggerEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }

    /// Most recent events first.
    pub fn recent(&self, limit: usize) -> Vec<TriggerEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TriggerLog {
    fn default() -> Self {
        Self::new(1000)
    }
}
