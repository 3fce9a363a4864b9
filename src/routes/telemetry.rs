use axum::{
    body::Bytes, extract::State, http::StatusCode, response::IntoResponse, routing::post, Json,
    Router,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{AppState, RawTelemetry};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/telemetry", post(handler))
}

/// Handle `POST /api/telemetry`.
///
/// Accepts a JSON object with `deviceId` (or `device_id`) and numeric
/// metrics. Anything else in the body is ignored.
async fn handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    // ---
    let result = match RawTelemetry::parse(&body) {
        Ok(raw) => state.ingest(raw, None).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(reading) => {
            info!(
                "POST /api/telemetry - stored {} metrics for {}",
                reading.fields().len(),
                reading.device_id()
            );
            (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
        }
        Err(e) => {
            warn!("POST /api/telemetry - rejected payload: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
