use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(liveness))
        .route("/ready", get(readiness))
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": { "status": "ok" } }))
}

async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    match sqlx::query("SELECT 1").execute(&state.db.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": { "status": "ready" } })),
        ),
        Err(err) => {
            tracing::error!(error = %err, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "message": "database unavailable" })),
            )
        }
    }
}
