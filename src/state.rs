use std::sync::Arc;

use chrono::Utc;

use crate::archive::Archiver;
use crate::engine::Engine;
use crate::error::{IngestError, RuleSetError};
use crate::models::{RawTelemetry, Reading};
use crate::rules::RuleSet;
use crate::store::DeviceStore;

// ---

/// Shared application state handed to every transport and route.
///
/// Cheaply cloneable; the store and engine live behind `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<DeviceStore>,
    pub engine: Arc<Engine>,
    pub archiver: Option<Archiver>,
}

impl AppState {
    // ---
    /// Fails when `rules` is not a valid rule set.
    pub fn new(rules: RuleSet, archiver: Option<Archiver>) -> Result<Self, RuleSetError> {
        Ok(AppState {
            store: Arc::new(DeviceStore::new()),
            engine: Arc::new(Engine::new(rules)?),
            archiver,
        })
    }

    /// Normalize, store and archive one telemetry message.
    ///
    /// `receivedAt` is stamped here, never taken from the device.
    pub async fn ingest(
        &self,
        raw: RawTelemetry,
        fallback_id: Option<&str>,
    ) -> Result<Reading, IngestError> {
        // ---
        let reading = raw.to_reading(fallback_id, Utc::now())?;
        self.store.upsert(reading.clone()).await;

        tracing::debug!(
            "Telemetry received from {}: {:?}",
            reading.device_id(),
            reading.fields()
        );

        if let Some(archiver) = &self.archiver {
            archiver.spawn_archive(reading.clone());
        }
        Ok(reading)
    }
}
