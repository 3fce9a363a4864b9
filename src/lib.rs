//! SmartSense advisor: telemetry ingestion and air-quality recommendations.
//!
//! Readings arrive over HTTP or MQTT, the latest one per device is kept in a
//! [`DeviceStore`], and the [`Engine`] turns a reading into a headline PM2.5
//! classification plus ordered, deduplicated advice.
//!
//! Module layout:
//! - `models`, `rules`, `engine`, `store`: the core, free of I/O
//! - `state`: shared handle tying the core to the transports
//! - `routes`, `mqtt`: ingress and query transports
//! - `archive`, `schema`: optional PostgreSQL archive of raw readings
//! - `config`: environment-driven configuration

pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod mqtt;
pub mod routes;
pub mod rules;
pub mod schema;
pub mod state;
pub mod store;

pub use config::{Config, MqttConfig};
pub use engine::{Classification, Engine, Recommendation};
pub use error::{EngineError, IngestError, RuleSetError, StoreError};
pub use models::{RawTelemetry, Reading};
pub use rules::{MetricRules, RuleSet, SecondaryRule, Tier};
pub use state::AppState;
pub use store::DeviceStore;
