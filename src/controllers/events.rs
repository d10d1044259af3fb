//! events.rs
//!
//! Event listing, detail, and creation. Creating an event atomically
//! creates its Tickets — one per seat, sequential opaque seat
//! identifiers.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    controllers::response::ApiResponse, error::Error, models::ticket::seat_no_for_index,
    models::Event, AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/tickets", get(list_tickets))
        .route("/events/{id}/tickets/all", get(list_all_tickets))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

fn clamp_limit(limit: Option<u32>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100) as i64
}

/// GET /api/v1/events?page&limit
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<ApiResponse<Vec<Event>>, Error> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = clamp_limit(params.limit);
    let offset = ((page - 1) as i64) * limit;

    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events ORDER BY start_time ASC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db.pool)
    .await
    .map_err(Error::from_sqlx)?;

    Ok(ApiResponse::ok(events))
}

/// GET /api/v1/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Event>, Error> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(Error::from_sqlx)?
        .ok_or(Error::NotFound)?;

    Ok(ApiResponse::ok(event))
}

#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    name: String,
    description: Option<String>,
    venue: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    total_tickets: i32,
    price: f64,
}

#[derive(Debug, Serialize)]
struct CreateEventResponse {
    #[serde(flatten)]
    event: Event,
    seats_created: i64,
}

/// POST /api/v1/events — creates the Event and its Tickets in one
/// transaction.
async fn create_event(
    State(state): State<Arc<AppState>>,
    axum::Json(req): axum::Json<CreateEventRequest>,
) -> Result<ApiResponse<CreateEventResponse>, Error> {
    let now = Utc::now();
    if req.end_time <= req.start_time {
        return Err(Error::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }
    if req.start_time <= now {
        return Err(Error::Validation(
            "start_time must be in the future".to_string(),
        ));
    }
    if req.total_tickets <= 0 {
        return Err(Error::Validation("total_tickets must be > 0".to_string()));
    }
    if req.price < 0.0 {
        return Err(Error::Validation("price must be >= 0".to_string()));
    }

    let mut tx = state.db.pool.begin().await.map_err(Error::from_sqlx)?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (name, description, venue, start_time, end_time, total_tickets, available_tickets, price)
        VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.venue)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.total_tickets)
    .bind(req.price)
    .fetch_one(&mut *tx)
    .await
    .map_err(Error::from_sqlx)?;

    let seat_nos: Vec<String> = (1..=req.total_tickets as u32)
        .map(seat_no_for_index)
        .collect();

    for seat_no in &seat_nos {
        sqlx::query("INSERT INTO tickets (event_id, seat_no, status) VALUES ($1, $2, 'available')")
            .bind(event.id)
            .bind(seat_no)
            .execute(&mut *tx)
            .await
            .map_err(Error::from_sqlx)?;
    }

    tx.commit().await.map_err(Error::from_sqlx)?;

    tracing::info!(event_id = event.id, seats = seat_nos.len(), "event created");

    Ok(ApiResponse::created(CreateEventResponse {
        seats_created: seat_nos.len() as i64,
        event,
    }))
}

/// GET /api/v1/events/{id}/tickets?limit — available seats only.
async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> Result<ApiResponse<Vec<crate::models::Ticket>>, Error> {
    let limit = clamp_limit(params.limit);
    let tickets = crate::seats::list_available(&state.db.pool, id, limit).await?;
    Ok(ApiResponse::ok(tickets))
}

/// GET /api/v1/events/{id}/tickets/all?limit — all seats, any status.
async fn list_all_tickets(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> Result<ApiResponse<Vec<crate::models::Ticket>>, Error> {
    let limit = clamp_limit(params.limit);
    let tickets = crate::seats::list_all(&state.db.pool, id, limit).await?;
    Ok(ApiResponse::ok(tickets))
}
