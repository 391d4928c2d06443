use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

/// One `(observed_at, temperature)` entry in a device window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub observed_at: DateTime<Utc>,
    pub temperature: f64,
}

/// Time-ordered history of recent temperatures for one device.
///
/// Invariant after every `push`: entries are ascending by `observed_at` and
/// none is older than the window duration relative to the newest entry. Time
/// is the only bound; evicting by count would move the rise baseline.
#[derive(Debug, Clone, Default)]
pub struct TemperatureWindow {
    samples: VecDeque<Sample>,
}

impl TemperatureWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample in timestamp order, then restore the invariant.
    pub fn push(&mut self, sample: Sample, window: Duration) {
        // Late arrivals land in order instead of at the back
        let idx = self
            .samples
            .partition_point(|s| s.observed_at <= sample.observed_at);
        self.samples.insert(idx, sample);

        // A late sample never moves the reference point backwards
        let newest = self.samples.back().map_or(sample.observed_at, |s| s.observed_at);
        self.prune(newest, window);
    }

    /// Drop entries whose age relative to `now` exceeds `window`.
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        while let Some(front) = self.samples.front() {
            let expired = now
                .signed_duration_since(front.observed_at)
                .to_std()
                .map(|age| age > window)
                .unwrap_or(false);
            if !expired {
                break;
            }
            self.samples.pop_front();
        }
    }

    /// Earliest surviving entry.
    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}
