//! tickets.rs
//!
//! Seat hold/release endpoints — the client-facing half of the Seat
//! Registry.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Router,
};
use std::sync::Arc;

use crate::{controllers::response::ApiResponse, error::Error, models::Ticket, seats, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/{id}/seats/{seat_no}/lock", post(lock_seat))
        .route("/events/{id}/seats/{seat_no}/unlock", post(unlock_seat))
}

/// POST /api/v1/events/{id}/seats/{seatNo}/lock
///
/// `X-Session-ID` is accepted and logged for observability only — it is
/// not bound to the hold.
async fn lock_seat(
    State(state): State<Arc<AppState>>,
    Path((event_id, seat_no)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Result<ApiResponse<Ticket>, Error> {
    let session_tag = headers
        .get("X-Session-ID")
        .and_then(|v| v.to_str().ok());

    let ticket = seats::hold(&state.db.pool, event_id, &seat_no, session_tag).await?;
    Ok(ApiResponse::ok(ticket))
}

/// POST /api/v1/events/{id}/seats/{seatNo}/unlock — idempotent.
async fn unlock_seat(
    State(state): State<Arc<AppState>>,
    Path((event_id, seat_no)): Path<(i64, String)>,
) -> Result<ApiResponse<serde_json::Value>, Error> {
    seats::release(&state.db.pool, event_id, &seat_no).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "released": true })))
}
