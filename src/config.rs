//! Configuration loader for the `smartsense-advisor` service.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller), so `env::var` calls are not scattered
//! throughout the codebase.
//!
use std::{env, path::PathBuf};

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_num {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable; empty values count as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

/// Connection settings for the optional MQTT ingress.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    // ---
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// HTTP listen port.
    pub port: u16,

    /// Optional JSON rule set; built-in rules are used when absent.
    pub rules_path: Option<PathBuf>,

    /// PostgreSQL connection string for the reading archive.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// MQTT subscriber settings, present when `MQTT_HOST` is set.
    pub mqtt: Option<MqttConfig>,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `PORT` – HTTP port (default: 3000)
/// - `RULES_PATH` – threshold rule set file
/// - `DATABASE_URL` – PostgreSQL connection string; enables archival
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `MQTT_HOST` – broker host; enables MQTT ingress
/// - `MQTT_PORT` – broker port (default: 1883)
/// - `MQTT_TOPIC` – subscription filter (default: `smartsense/#`)
/// - `MQTT_CLIENT_ID` – client id (default: `smartsense-advisor`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let port = parse_env_num!("PORT", u16, 3000);
    let rules_path = optional_env!("RULES_PATH").map(PathBuf::from);
    let db_url = optional_env!("DATABASE_URL");
    let db_pool_max = parse_env_num!("DB_POOL_MAX", u32, 5);

    let mqtt = match optional_env!("MQTT_HOST") {
        Some(host) => Some(MqttConfig {
            host,
            port: parse_env_num!("MQTT_PORT", u16, 1883),
            topic: optional_env!("MQTT_TOPIC").unwrap_or_else(|| "smartsense/#".to_string()),
            client_id: optional_env!("MQTT_CLIENT_ID")
                .unwrap_or_else(|| "smartsense-advisor".to_string()),
        }),
        None => None,
    };

    Ok(Config {
        port,
        rules_path,
        db_url,
        db_pool_max,
        mqtt,
    })
}

/// Replace the password in a connection URL with `****`.
fn mask_db_url(db_url: &str) -> String {
    // ---
    let scheme_end = db_url.find("://").map_or(0, |p| p + 3);
    if let Some(at_pos) = db_url.rfind('@') {
        // Only a colon inside the user-info part separates a password
        if let Some(colon_pos) = db_url[..at_pos].rfind(':').filter(|&p| p >= scheme_end) {
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all other values.
    pub fn log_config(&self) {
        // ---
        let unset = || "(unset)".to_string();

        tracing::info!("Configuration loaded:");
        tracing::info!("  PORT         : {}", self.port);
        tracing::info!(
            "  RULES_PATH   : {}",
            self.rules_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(unset)
        );
        tracing::info!(
            "  DATABASE_URL : {}",
            self.db_url.as_deref().map(mask_db_url).unwrap_or_else(unset)
        );
        tracing::info!("  DB_POOL_MAX  : {}", self.db_pool_max);
        match &self.mqtt {
            Some(mqtt) => tracing::info!(
                "  MQTT         : {}:{} topic={} client_id={}",
                mqtt.host,
                mqtt.port,
                mqtt.topic,
                mqtt.client_id
            ),
            None => tracing::info!("  MQTT         : (disabled)"),
        }
    }
}
