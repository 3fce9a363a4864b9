//! MQTT ingress: subscribe to device topics and feed the device store.
//!
//! Each publish payload is a JSON object parsed exactly like the HTTP
//! telemetry body. When the payload carries no device id, the last topic
//! segment is used instead (`smartsense/<device-id>`).

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};

use crate::config::MqttConfig;
use crate::models::RawTelemetry;
use crate::state::AppState;

// ---

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Start the subscriber on a background task.
///
/// The event loop reconnects on its own after errors; the subscription is
/// renewed on every `ConnAck`.
pub fn spawn_subscriber(cfg: MqttConfig, state: AppState) -> tokio::task::JoinHandle<()> {
    // ---
    let mut options = MqttOptions::new(cfg.client_id.clone(), cfg.host.clone(), cfg.port);
    options.set_keep_alive(KEEP_ALIVE);

    let (client, eventloop) = AsyncClient::new(options, 64);
    tracing::info!("Starting MQTT client for {}:{}", cfg.host, cfg.port);

    tokio::spawn(run(client, eventloop, cfg.topic, state))
}

async fn run(client: AsyncClient, mut eventloop: EventLoop, topic: String, state: AppState) {
    // ---
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("MQTT connected, subscribing to {}", topic);
                if let Err(e) = client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                    tracing::error!("MQTT subscribe to {} failed: {}", topic, e);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_publish(&state, &publish).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    "MQTT connection error: {} -> reconnecting in {}s",
                    e,
                    RECONNECT_DELAY.as_secs()
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn handle_publish(state: &AppState, publish: &Publish) {
    // ---
    tracing::debug!(
        "MQTT received on {} ({} bytes)",
        publish.topic,
        publish.payload.len()
    );

    let raw = match RawTelemetry::parse(&publish.payload) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Dropping MQTT message on {}: {}", publish.topic, e);
            return;
        }
    };

    if let Err(e) = state.ingest(raw, device_id_from_topic(&publish.topic)).await {
        tracing::warn!("Dropping MQTT message on {}: {}", publish.topic, e);
    }
}

/// Last non-empty, non-wildcard segment of a topic.
pub fn device_id_from_topic(topic: &str) -> Option<&str> {
    topic
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && *s != "#" && *s != "+")
}
