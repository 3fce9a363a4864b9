//! Data models for the SmartSense telemetry pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::IngestError;

// ---

/// Metric names understood by the default rule set.
pub mod metrics {
    pub const TEMPERATURE: &str = "temperature";
    pub const HUMIDITY: &str = "humidity";
    pub const PM2_5: &str = "pm2_5";
    pub const CO2: &str = "co2";
    pub const VOC_INDEX: &str = "voc_index";

    pub const KNOWN: [&str; 5] = [TEMPERATURE, HUMIDITY, PM2_5, CO2, VOC_INDEX];

    /// Returns true for one of the metrics above.
    pub fn is_known(name: &str) -> bool {
        KNOWN.contains(&name)
    }
}

/// Keys accepted as the device identifier in a telemetry payload.
const DEVICE_ID_KEYS: [&str; 2] = ["deviceId", "device_id"];

/// One device's metric values captured at one point in time.
///
/// Readings are immutable once built; the only way to change what the store
/// holds for a device is to ingest a new reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    device_id: String,
    fields: BTreeMap<String, f64>,
    received_at: DateTime<Utc>,
}

impl Reading {
    // ---
    /// Build a reading, rejecting an empty or blank device identifier.
    pub fn new(
        device_id: impl Into<String>,
        fields: BTreeMap<String, f64>,
        received_at: DateTime<Utc>,
    ) -> Result<Self, IngestError> {
        // ---
        let device_id = device_id.into();
        if device_id.trim().is_empty() {
            return Err(IngestError::MissingDeviceId);
        }

        Ok(Reading {
            device_id,
            fields,
            received_at,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Value of a single metric, if the device reported it.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.fields.get(metric).copied()
    }
}

/// Telemetry as delivered by a transport, before normalization.
///
/// Both the HTTP endpoint and the MQTT subscriber produce this from a JSON
/// object. Non-numeric values other than the device id are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTelemetry {
    // ---
    pub device_id: Option<String>,
    pub values: BTreeMap<String, f64>,
}

impl RawTelemetry {
    // ---
    /// Parse a JSON payload from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, IngestError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| IngestError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    /// Extract the device id and numeric metrics from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        // ---
        let Value::Object(map) = value else {
            return Err(IngestError::NotAnObject);
        };

        let device_id = device_id_from(&map);
        let values = map
            .iter()
            .filter(|(key, _)| !DEVICE_ID_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| {
                value
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .map(|v| (key.clone(), v))
            })
            .collect();

        Ok(RawTelemetry { device_id, values })
    }

    /// Normalize into a [`Reading`] stamped with the ingestion time.
    ///
    /// `fallback_id` is used when the payload itself carries no device id,
    /// e.g. when the id is encoded in an MQTT topic.
    pub fn to_reading(
        self,
        fallback_id: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> Result<Reading, IngestError> {
        // ---
        let device_id = self
            .device_id
            .or_else(|| fallback_id.map(str::to_string))
            .ok_or(IngestError::MissingDeviceId)?;

        for name in self.values.keys().filter(|k| !metrics::is_known(k)) {
            tracing::debug!("Device {} reported unknown metric '{}'", device_id, name);
        }

        Reading::new(device_id, self.values, received_at)
    }
}

fn device_id_from(map: &Map<String, Value>) -> Option<String> {
    // ---
    DEVICE_ID_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
