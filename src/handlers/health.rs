use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fharma-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let delivery_ok = state.ws_tx.is_some();

    if delivery_ok {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "delivery_channel": "ok" },
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": { "delivery_channel": "missing" },
            })),
        )
    }
}
