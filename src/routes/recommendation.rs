use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{AppState, Classification};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/recommendation/{device_id}", get(handler))
}

/// Response body for a device with data.
///
/// When the reading lacks the primary metric, `status` is `"unavailable"`,
/// `reason` explains why, and the advice fields are omitted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResponse {
    // ---
    device_id: String,
    current_values: BTreeMap<String, f64>,
    received_at: DateTime<Utc>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Handle `GET /api/recommendation/{device_id}`.
async fn handler(
    Path(device_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    let reading = match state.store.get_latest(&device_id).await {
        Ok(reading) => reading,
        Err(e) => {
            debug!("GET /api/recommendation - {}", e);
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "No telemetry data for this device yet" })),
            )
                .into_response();
        }
    };

    let mut response = RecommendationResponse {
        device_id: reading.device_id().to_string(),
        current_values: reading.fields().clone(),
        received_at: reading.received_at(),
        status: "ok",
        recommendations: None,
        classification: None,
        reason: None,
    };

    match state.engine.evaluate(&reading) {
        Ok(recommendation) => {
            info!(
                "GET /api/recommendation - {} is '{}' with {} advice",
                device_id,
                recommendation.classification.label,
                recommendation.recommendations.len()
            );
            response.recommendations = Some(recommendation.recommendations);
            response.classification = Some(recommendation.classification);
        }
        Err(e) => {
            info!("GET /api/recommendation - {} unavailable: {}", device_id, e);
            response.status = "unavailable";
            response.reason = Some(e.to_string());
        }
    }

    (StatusCode::OK, Json(response)).into_response()
}
