//! bookings.rs
//!
//! HTTP adapter over the Booking Engine: reserve, inspect, confirm, and
//! cancel bookings.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{bookings, controllers::response::ApiResponse, error::Error, models::Booking, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/confirm", post(confirm_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    user_id: i64,
    event_id: i64,
    quantity: i32,
}

/// POST /api/v1/bookings — reserves the user's already-held seats.
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<ApiResponse<Booking>, Error> {
    let booking = bookings::book(
        &state.db.pool,
        &state.config.gateway,
        &state.config.reservation,
        &state.cancel,
        bookings::BookRequest {
            user_id: req.user_id,
            event_id: req.event_id,
            quantity: req.quantity,
        },
    )
    .await?;

    Ok(ApiResponse::created(booking))
}

/// GET /api/v1/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Booking>, Error> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(Error::from_sqlx)?
        .ok_or(Error::NotFound)?;

    Ok(ApiResponse::ok(booking))
}

/// POST /api/v1/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Booking>, Error> {
    let booking = bookings::confirm(&state.db.pool, id).await?;
    Ok(ApiResponse::ok(booking))
}

/// POST /api/v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Booking>, Error> {
    let booking = bookings::cancel(&state.db.pool, id).await?;
    Ok(ApiResponse::ok(booking))
}
