//! Seat Registry: per-seat state changes and queries for a single event.
//! Enforces the ticket state machine's status transitions.

use sqlx::PgPool;

use crate::{
    error::Error,
    gateway,
    models::{Ticket, TicketStatus},
};

/// Returns Tickets with status `available`, ordered by `seat_no` ascending.
pub async fn list_available(pool: &PgPool, event_id: i64, limit: i64) -> Result<Vec<Ticket>, Error> {
    sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE event_id = $1 AND status = 'available' \
         ORDER BY seat_no ASC LIMIT $2",
    )
    .bind(event_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(Error::from_sqlx)
}

/// Returns all Tickets of the event ordered by `seat_no`, for UI
/// rendering of occupancy.
pub async fn list_all(pool: &PgPool, event_id: i64, limit: i64) -> Result<Vec<Ticket>, Error> {
    sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE event_id = $1 ORDER BY seat_no ASC LIMIT $2",
    )
    .bind(event_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(Error::from_sqlx)
}

/// Opens a transaction, takes a `FOR UPDATE` row lock on the ticket,
/// verifies the current status is `available`, transitions it to
/// `held`. `session_tag` is accepted for observability only — the
/// system trusts that a client who holds a seat is the one who later
/// purchases it.
pub async fn hold(
    pool: &PgPool,
    event_id: i64,
    seat_no: &str,
    session_tag: Option<&str>,
) -> Result<Ticket, Error> {
    gateway::run_in_tx(pool, move |tx| {
        let seat_no = seat_no.to_string();
        let session_tag = session_tag.map(|s| s.to_string());
        Box::pin(async move {
            let ticket = sqlx::query_as::<_, Ticket>(
                "SELECT * FROM tickets WHERE event_id = $1 AND seat_no = $2 FOR UPDATE",
            )
            .bind(event_id)
            .bind(&seat_no)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::from_sqlx)?
            .ok_or(Error::NotFound)?;

            if ticket.status != TicketStatus::Available {
                return Err(Error::Conflict {
                    current_status: ticket.status.to_string(),
                });
            }

            tracing::debug!(event_id, seat_no = %seat_no, session_tag = ?session_tag, "holding seat");

            let updated = sqlx::query_as::<_, Ticket>(
                "UPDATE tickets SET status = 'held', updated_at = NOW() \
                 WHERE id = $1 RETURNING *",
            )
            .bind(ticket.id)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::from_sqlx)?;

            Ok(updated)
        })
    })
    .await
}

/// Transitions the ticket from `held` back to `available`. No-op (and
/// not an error) if the current status is not `held` — release is
/// idempotent.
pub async fn release(pool: &PgPool, event_id: i64, seat_no: &str) -> Result<(), Error> {
    sqlx::query(
        "UPDATE tickets SET status = 'available', updated_at = NOW() \
         WHERE event_id = $1 AND seat_no = $2 AND status = 'held'",
    )
    .bind(event_id)
    .bind(seat_no)
    .execute(pool)
    .await
    .map_err(Error::from_sqlx)?;
    Ok(())
}

/// Sets `held` tickets whose `updated_at` is older than `hold_ttl` back
/// to `available`. Returns the count reclaimed. Invoked by the Hold
/// Reaper.
pub async fn reclaim_stale(pool: &PgPool, hold_ttl: std::time::Duration) -> Result<u64, Error> {
    let hold_ttl_secs = hold_ttl.as_secs() as f64;
    let result = sqlx::query(
        "UPDATE tickets SET status = 'available', updated_at = NOW() \
         WHERE status = 'held' AND updated_at < NOW() - make_interval(secs => $1)",
    )
    .bind(hold_ttl_secs)
    .execute(pool)
    .await
    .map_err(Error::from_sqlx)?;
    Ok(result.rows_affected())
}
