use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use smartsense::{routes, AppState, RuleSet};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationBody {
    device_id: String,
    current_values: BTreeMap<String, f64>,
    received_at: DateTime<Utc>,
    status: String,
    recommendations: Option<Vec<String>>,
    classification: Option<ClassificationBody>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationBody {
    label: String,
    color: String,
    text_color: String,
}

/// Serve the real router with an in-memory store on an ephemeral port.
async fn spawn_app() -> Result<String> {
    // ---
    let app = routes::router(AppState::new(RuleSet::default(), None)?);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(format!("http://{}", addr))
}

async fn post_telemetry(client: &Client, base: &str, body: Value) -> Result<StatusCode> {
    let response = client
        .post(format!("{}/api/telemetry", base))
        .json(&body)
        .send()
        .await?;
    Ok(response.status())
}

#[tokio::test]
async fn recommendation_for_ingested_reading() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let client = Client::new();

    let status = post_telemetry(
        &client,
        &base,
        json!({
            "deviceId": "sim-001",
            "pm2_5": 40.0,
            "temperature": 30.0,
            "co2": 1500,
            "timestamp_utc": "2025-03-26T18:45:00Z"
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let url = format!("{}/api/recommendation/sim-001", base);
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: RecommendationBody = response.json().await?;

    assert_eq!(body.device_id, "sim-001");
    assert_eq!(body.status, "ok");
    assert_eq!(body.current_values.len(), 3);
    assert!(body.received_at > DateTime::from_timestamp(0, 0).unwrap());
    assert!(body.reason.is_none());

    let classification = body.classification.expect("classification present");
    assert_eq!(classification.label, "Unhealthy for Sensitive Groups");
    assert_eq!(classification.color, "#ff7e00");
    assert_eq!(classification.text_color, "white");

    let advice = body.recommendations.expect("recommendations present");
    assert_eq!(advice.len(), 4);
    assert!(advice[0].starts_with("Ventilate the room"));
    assert_eq!(advice[1], "Open windows or reduce heating to cool the room.");
    assert!(advice[2].starts_with("CO2 is very high"));
    assert!(advice[3].starts_with("CO2 is high"));

    Ok(())
}

#[tokio::test]
async fn newer_reading_replaces_older() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let client = Client::new();

    post_telemetry(&client, &base, json!({ "device_id": "dev-1", "pm2_5": 80.0, "co2": 900 }))
        .await?;
    post_telemetry(&client, &base, json!({ "device_id": "dev-1", "pm2_5": 5.0 })).await?;

    let url = format!("{}/api/recommendation/dev-1", base);
    let body: RecommendationBody = client.get(&url).send().await?.json().await?;

    assert_eq!(body.current_values.get("co2"), None);
    assert_eq!(body.classification.map(|c| c.label).as_deref(), Some("Good"));
    assert_eq!(
        body.recommendations,
        Some(vec!["Air conditions are good. No action required.".to_string()])
    );

    Ok(())
}

#[tokio::test]
async fn unknown_device_is_not_found() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let client = Client::new();

    let url = format!("{}/api/recommendation/never-seen", base);
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await?;
    assert_eq!(body["error"], "No telemetry data for this device yet");

    Ok(())
}

#[tokio::test]
async fn missing_primary_metric_is_unavailable() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let client = Client::new();

    post_telemetry(
        &client,
        &base,
        json!({ "deviceId": "legacy", "temperature": 31.0, "airQuality": 1700 }),
    )
    .await?;

    let url = format!("{}/api/recommendation/legacy", base);
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: RecommendationBody = response.json().await?;
    assert_eq!(body.status, "unavailable");
    assert!(body.recommendations.is_none());
    assert!(body.classification.is_none());
    assert!(body.reason.unwrap_or_default().contains("pm2_5"));
    assert_eq!(body.current_values.get("airQuality"), Some(&1700.0));

    Ok(())
}

#[tokio::test]
async fn malformed_telemetry_is_rejected() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let client = Client::new();

    let status = post_telemetry(&client, &base, json!({ "pm2_5": 12.0 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = post_telemetry(&client, &base, json!([1, 2, 3])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/telemetry", base))
        .body("{not json")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let devices: Vec<Value> = client
        .get(format!("{}/api/devices", base))
        .send()
        .await?
        .json()
        .await?;
    assert!(devices.is_empty());

    Ok(())
}

#[tokio::test]
async fn latest_and_devices() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let client = Client::new();

    let body: Value = client
        .get(format!("{}/api/latest", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["message"], "No data yet");

    post_telemetry(&client, &base, json!({ "deviceId": "b-device", "pm2_5": 7.0 })).await?;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    post_telemetry(&client, &base, json!({ "deviceId": "a-device", "co2": 650 })).await?;

    let body: Value = client
        .get(format!("{}/api/latest", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["deviceId"], "a-device");
    assert_eq!(body["fields"]["co2"], 650.0);

    let devices: Vec<Value> = client
        .get(format!("{}/api/devices", base))
        .send()
        .await?
        .json()
        .await?;
    let ids: Vec<&str> = devices
        .iter()
        .filter_map(|d| d["deviceId"].as_str())
        .collect();
    assert_eq!(ids, ["a-device", "b-device"]);

    Ok(())
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    // ---
    let base = spawn_app().await?;
    let body: Value = Client::new()
        .get(format!("{}/health", base))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "ok");
    assert!(body["time"].is_string());

    Ok(())
}
