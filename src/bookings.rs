//! Booking Engine: orchestrates the multi-step reservation protocol.
//! This is the heart of the system — it must guarantee no two
//! sessions ever hold the same seat, a confirmed booking covers exactly
//! the seats the user locked, and counts never drift under concurrent
//! load or partial failure.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{GatewayConfig, ReservationConfig},
    error::Error,
    gateway,
    models::{Booking, BookingStatus, Ticket},
};

pub struct BookRequest {
    pub user_id: i64,
    pub event_id: i64,
    pub quantity: i32,
}

/// `book` is executed inside `run_with_retry(run_in_tx(...))`; any error
/// aborts the transaction and the whole attempt is retried from
/// scratch if the failure was transient.
pub async fn book(
    pool: &PgPool,
    gateway_config: &GatewayConfig,
    reservation_config: &ReservationConfig,
    cancel: &CancellationToken,
    request: BookRequest,
) -> Result<Booking, Error> {
    if request.quantity < 1 {
        return Err(Error::Validation("quantity must be >= 1".to_string()));
    }

    gateway::run_with_retry(gateway_config, cancel, || {
        let request = BookRequest {
            user_id: request.user_id,
            event_id: request.event_id,
            quantity: request.quantity,
        };
        let booking_ttl = reservation_config.booking_ttl;
        async move {
            gateway::run_in_tx(pool, move |tx| {
                Box::pin(async move { book_in_tx(tx, &request, booking_ttl).await })
            })
            .await
        }
    })
    .await
}

async fn book_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    request: &BookRequest,
    booking_ttl: std::time::Duration,
) -> Result<Booking, Error> {
    // Step 1: lock event row.
    let (event_price, event_start, event_available): (f64, chrono::DateTime<Utc>, i32) =
        sqlx::query_as(
            "SELECT price, start_time, available_tickets FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(request.event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::from_sqlx)?
        .ok_or(Error::NotFound)?;

    // Step 2: validate timing.
    let now = Utc::now();
    if now >= event_start {
        return Err(Error::EventStarted);
    }

    // Step 3: claim held seats, stable seat_no order, bounded by quantity.
    // This ordering establishes a global lock order across concurrent
    // bookings for the same event and guarantees the same seats are
    // returned given the same set of holds.
    let claimed: Vec<Ticket> = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE event_id = $1 AND status = 'held' \
         ORDER BY seat_no ASC LIMIT $2 FOR UPDATE",
    )
    .bind(request.event_id)
    .bind(request.quantity as i64)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?;

    // Step 4: sufficiency check.
    if (claimed.len() as i32) < request.quantity {
        return Err(Error::InsufficientHeld {
            requested: request.quantity as i64,
            found: claimed.len() as i64,
        });
    }

    let ticket_ids: Vec<i64> = claimed.iter().map(|t| t.id).collect();

    // Step 5: transition claimed tickets to reserved.
    let affected = sqlx::query(
        "UPDATE tickets SET status = 'reserved', updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(&ticket_ids)
    .execute(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?
    .rows_affected();

    if affected as usize != ticket_ids.len() {
        return Err(Error::Inconsistent(format!(
            "expected to reserve {} tickets, affected {}",
            ticket_ids.len(),
            affected
        )));
    }

    // Step 6: decrement event counter (same transaction, same row lock).
    if event_available < request.quantity {
        return Err(Error::Inconsistent(
            "available_tickets counter is out of sync with ticket statuses".to_string(),
        ));
    }
    sqlx::query("UPDATE events SET available_tickets = available_tickets - $1, updated_at = NOW() WHERE id = $2")
        .bind(request.quantity)
        .bind(request.event_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::from_sqlx)?;

    // Step 7: create booking.
    let booking_ref = generate_booking_ref();
    let total_amount = event_price * request.quantity as f64;
    let expires_at = now + booking_ttl;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings
            (user_id, event_id, ticket_ids, quantity, total_amount, status, booking_ref, expires_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
        RETURNING *
        "#,
    )
    .bind(request.user_id)
    .bind(request.event_id)
    .bind(&ticket_ids)
    .bind(request.quantity)
    .bind(total_amount)
    .bind(&booking_ref)
    .bind(expires_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?;

    tracing::info!(
        booking_id = booking.id,
        booking_ref = %booking.booking_ref,
        event_id = request.event_id,
        quantity = request.quantity,
        "booking created"
    );

    Ok(booking)
}

/// confirm(booking_id): locks the booking, rejects if not pending or
/// past `expires_at`, transitions tickets reserved -> sold, sets
/// booking status confirmed. Single-attempt (no retry): a stale booking
/// lookup or an expiry check is not a transient conflict.
pub async fn confirm(pool: &PgPool, booking_id: i64) -> Result<Booking, Error> {
    gateway::run_in_tx(pool, move |tx| {
        Box::pin(async move { confirm_in_tx(tx, booking_id).await })
    })
    .await
}

async fn confirm_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: i64,
) -> Result<Booking, Error> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::from_sqlx)?
        .ok_or(Error::NotFound)?;

    if booking.status != BookingStatus::Pending {
        return Err(Error::Validation(format!(
            "booking {booking_id} is {}, not pending",
            booking.status
        )));
    }
    if Utc::now() > booking.expires_at {
        return Err(Error::Expired);
    }

    let affected = sqlx::query(
        "UPDATE tickets SET status = 'sold', updated_at = NOW() \
         WHERE id = ANY($1) AND status = 'reserved'",
    )
    .bind(&booking.ticket_ids)
    .execute(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?
    .rows_affected();

    if affected as usize != booking.ticket_ids.len() {
        return Err(Error::Inconsistent(format!(
            "booking {booking_id}: expected {} reserved->sold transitions, affected {affected}",
            booking.ticket_ids.len()
        )));
    }

    let confirmed = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = 'confirmed', updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(booking_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?;

    tracing::info!(booking_id, booking_ref = %confirmed.booking_ref, "booking confirmed");

    Ok(confirmed)
}

/// cancel(booking_id): restores the booking's tickets to `available`
/// regardless of whether they are currently `reserved` or `sold`,
/// restores the Event's `available_tickets` counter, and marks the
/// booking cancelled. Rejects only an already-cancelled booking.
pub async fn cancel(pool: &PgPool, booking_id: i64) -> Result<Booking, Error> {
    gateway::run_in_tx(pool, move |tx| {
        Box::pin(async move { cancel_in_tx(tx, booking_id).await })
    })
    .await
}

async fn cancel_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: i64,
) -> Result<Booking, Error> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::from_sqlx)?
        .ok_or(Error::NotFound)?;

    if booking.status == BookingStatus::Cancelled {
        return Err(Error::Validation(format!(
            "booking {booking_id} is already cancelled"
        )));
    }

    sqlx::query(
        "UPDATE tickets SET status = 'available', updated_at = NOW() \
         WHERE id = ANY($1) AND status IN ('reserved', 'sold')",
    )
    .bind(&booking.ticket_ids)
    .execute(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?;

    // Lock the event row before adjusting its counter, matching the
    // row-lock discipline every contended path takes.
    sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(booking.event_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::from_sqlx)?;

    sqlx::query(
        "UPDATE events SET available_tickets = available_tickets + $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(booking.quantity)
    .bind(booking.event_id)
    .execute(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?;

    let cancelled = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(booking_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(Error::from_sqlx)?;

    tracing::info!(booking_id, booking_ref = %cancelled.booking_ref, "booking cancelled");

    Ok(cancelled)
}

const BASE36_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A printable token guaranteed unique without a database round trip: a
/// fixed prefix plus a high-resolution monotonic timestamp rendered
/// base36. Uniqueness is additionally enforced by the unique constraint
/// on `bookings.booking_ref`.
pub fn generate_booking_ref() -> String {
    let now = Utc::now();
    let nanos = now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp() * 1_000_000_000);
    format!("BOOK-{}", to_base36(nanos.max(0) as u128))
}

pub fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % 36) as usize;
        digits.push(BASE36_ALPHABET[digit]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 alphabet is ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_ref_has_fixed_prefix_and_is_printable() {
        let a = generate_booking_ref();
        assert!(a.starts_with("BOOK-"));
        assert!(a[5..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn booking_ref_is_monotonic_for_increasing_input() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert!(to_base36(100) > to_base36(1));
    }
}
