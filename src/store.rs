//! In-memory latest-state store: one reading per device.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::Reading;

// ---

/// Holds the most recent [`Reading`] for every device that has reported.
///
/// Thread-safe via interior `RwLock`; created once at startup and shared
/// behind an `Arc` by the ingestion and query paths. Lookups take the read
/// lock and do not block each other. Entries are never evicted.
#[derive(Debug, Default)]
pub struct DeviceStore {
    readings: RwLock<HashMap<String, Reading>>,
}

impl DeviceStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the reading for `reading.device_id()`.
    ///
    /// Returns the reading that was replaced, if any.
    pub async fn upsert(&self, reading: Reading) -> Option<Reading> {
        // ---
        let device_id = reading.device_id().to_string();
        let previous = self
            .readings
            .write()
            .await
            .insert(device_id.clone(), reading);

        if previous.is_none() {
            tracing::info!("First reading from device {}", device_id);
        }
        previous
    }

    /// Latest reading for `device_id`.
    pub async fn get_latest(&self, device_id: &str) -> Result<Reading, StoreError> {
        self.readings
            .read()
            .await
            .get(device_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(device_id.to_string()))
    }

    /// The newest reading across all devices. Ties on `received_at` go to the
    /// greater device id so the answer is stable.
    pub async fn latest_overall(&self) -> Option<Reading> {
        self.readings
            .read()
            .await
            .values()
            .max_by(|a, b| {
                a.received_at()
                    .cmp(&b.received_at())
                    .then_with(|| a.device_id().cmp(b.device_id()))
            })
            .cloned()
    }

    /// Every known device with the time of its latest reading, sorted by id.
    pub async fn devices(&self) -> Vec<(String, DateTime<Utc>)> {
        // ---
        let mut devices: Vec<(String, DateTime<Utc>)> = self
            .readings
            .read()
            .await
            .values()
            .map(|r| (r.device_id().to_string(), r.received_at()))
            .collect();
        devices.sort_by(|a, b| a.0.cmp(&b.0));
        devices
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }
}
