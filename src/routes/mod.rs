use axum::Router;

use crate::AppState;

mod health;
mod latest;
mod recommendation;
mod telemetry;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    let api = Router::new()
        .merge(telemetry::router())
        .merge(recommendation::router())
        .merge(latest::router());

    Router::new()
        .nest("/api", api)
        .merge(health::router())
        .with_state(state)
}
