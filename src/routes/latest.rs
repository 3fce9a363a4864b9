use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/latest", get(latest))
        .route("/devices", get(devices))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceSummary {
    device_id: String,
    received_at: DateTime<Utc>,
}

/// Handle `GET /api/latest`: the newest reading from any device.
async fn latest(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    match state.store.latest_overall().await {
        Some(reading) => Json(reading).into_response(),
        None => Json(json!({ "message": "No data yet" })).into_response(),
    }
}

/// Handle `GET /api/devices`: every device that has reported, sorted by id.
async fn devices(State(state): State<AppState>) -> Json<Vec<DeviceSummary>> {
    // ---
    let devices = state
        .store
        .devices()
        .await
        .into_iter()
        .map(|(device_id, received_at)| DeviceSummary {
            device_id,
            received_at,
        })
        .collect();
    Json(devices)
}
