use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::controllers::relay::RelayController;

/// GET / - liveness, configured backend, and the request counter.
pub async fn root(State(controller): State<Arc<RelayController>>) -> Json<Value> {
    Json(json!({
        "message": "TTS relay API service",
        "status": "running",
        "backend_server": controller.backend_url(),
        "requests_processed": controller.requests_processed(),
    }))
}
