use super::{DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Decoded image as uploaded by a camera.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub device_id: String,
    /// Reading the capture belongs to
    pub sensor_data_id: Option<u64>,
    pub data: Vec<u8>,
}

/// An image as persisted. Listing returns metadata only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredImage {
    pub id: u64,
    pub device_id: String,
    pub sensor_data_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub size_bytes: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageFilter {
    pub device_id: Option<String>,
    pub sensor_data_id: Option<u64>,
    pub limit: Option<usize>,
}

impl ImageFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .min(MAX_QUERY_LIMIT)
    }

    fn matches(&self, image: &StoredImage) -> bool {
        self.device_id
            .as_deref()
            .map_or(true, |id| image.device_id == id)
            && self
                .sensor_data_id
                .map_or(true, |id| image.sensor_data_id == Some(id))
    }
}

/// append/query contract for camera captures.
pub trait ImageStore: Send + Sync {
    /// Persist an image and return the stored metadata.
    fn append(&self, image: NewImage) -> StoredImage;

    /// Matching images, most recently received first.
    fn query(&self, filter: &ImageFilter) -> Vec<StoredImage>;
}

/// Bounded in-memory image store. Oldest images are dropped past `max_images`.
pub struct MemoryImageStore {
    images: RwLock<VecDeque<StoredImage>>,
    next_id: AtomicU64,
    max_images: usize,
}

impl MemoryImageStore {
    pub fn new(max_images: usize) -> Self {
        Self {
            images: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            max_images: max_images.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryImageStore {
    fn default() -> Self {
        Self::new(500)
    }
}

/// `<device>_<YYYYmmdd_HHMMSS>_<id>.jpg`
fn capture_filename(device_id: &str, at: DateTime<Utc>, id: u64) -> String {
    format!("{}_{}_{:08}.jpg", device_id, at.format("%Y%m%d_%H%M%S"), id)
}

impl ImageStore for MemoryImageStore {
    fn append(&self, image: NewImage) -> StoredImage {
        let mut images = self.images.write().unwrap_or_else(PoisonError::into_inner);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let timestamp = Utc::now();
        let stored = StoredImage {
            id,
            filename: capture_filename(&image.device_id, timestamp, id),
            device_id: image.device_id,
            sensor_data_id: image.sensor_data_id,
            timestamp,
            size_bytes: image.data.len(),
            data: image.data,
        };
        images.push_back(stored.clone());
        while images.len() > self.max_images {
            images.pop_front();
        }
        stored
    }

    fn query(&self, filter: &ImageFilter) -> Vec<StoredImage> {
        let images = self.images.read().unwrap_or_else(PoisonError::into_inner);
        // Stored in arrival order
        images
            .iter()
            .rev()
            .filter(|image| filter.matches(image))
            .take(filter.effective_limit())
            .cloned()
            .collect()
    }
}
