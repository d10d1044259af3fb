//! End-to-end coverage of the Booking Engine's reservation protocol
//! against a real Postgres instance.

use chrono::{Duration as ChronoDuration, Utc};
use fake::{faker::internet::en::SafeEmail, faker::name::en::Name, Fake};
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use venue_reserve::{
    bookings::{self, BookRequest},
    config::{GatewayConfig, ReservationConfig},
    models::{BookingStatus, TicketStatus},
    seats,
};

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        retry_max: 3,
        retry_delay: Duration::from_millis(10),
    }
}

fn reservation_config() -> ReservationConfig {
    ReservationConfig {
        hold_ttl: Duration::from_secs(180),
        booking_ttl: Duration::from_secs(900),
        sweep_interval: Duration::from_secs(60),
    }
}

async fn seed_user(pool: &PgPool) -> i64 {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_event(pool: &PgPool, total_tickets: i32, starts_in: ChronoDuration) -> i64 {
    let start_time = Utc::now() + starts_in;
    let end_time = start_time + ChronoDuration::hours(3);
    let event_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO events (name, venue, start_time, end_time, total_tickets, available_tickets, price)
        VALUES ($1, $2, $3, $4, $5, $5, $6)
        RETURNING id
        "#,
    )
    .bind("Orchestra Night")
    .bind("Symphony Hall")
    .bind(start_time)
    .bind(end_time)
    .bind(total_tickets)
    .bind(42.50_f64)
    .fetch_one(pool)
    .await
    .unwrap();

    for i in 1..=total_tickets {
        sqlx::query("INSERT INTO tickets (event_id, seat_no, status) VALUES ($1, $2, 'available')")
            .bind(event_id)
            .bind(format!("S{:03}", i))
            .execute(pool)
            .await
            .unwrap();
    }

    event_id
}

#[sqlx::test]
async fn happy_path_hold_then_book_then_confirm(pool: PgPool) {
    let event_id = seed_event(&pool, 5, ChronoDuration::hours(1)).await;
    let user_id = seed_user(&pool).await;

    seats::hold(&pool, event_id, "S001", None).await.unwrap();
    seats::hold(&pool, event_id, "S002", None).await.unwrap();

    let cancel = CancellationToken::new();
    let booking = bookings::book(
        &pool,
        &gateway_config(),
        &reservation_config(),
        &cancel,
        BookRequest {
            user_id,
            event_id,
            quantity: 2,
        },
    )
    .await
    .unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.ticket_ids.len(), 2);
    assert!(booking.booking_ref.starts_with("BOOK-"));

    let confirmed = bookings::confirm(&pool, booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    for ticket_id in &confirmed.ticket_ids {
        let status: TicketStatus =
            sqlx::query_scalar("SELECT status FROM tickets WHERE id = $1")
                .bind(ticket_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, TicketStatus::Sold);
    }
}

#[sqlx::test]
async fn booking_fails_when_fewer_seats_held_than_requested(pool: PgPool) {
    let event_id = seed_event(&pool, 5, ChronoDuration::hours(1)).await;
    let user_id = seed_user(&pool).await;

    seats::hold(&pool, event_id, "S001", None).await.unwrap();

    let cancel = CancellationToken::new();
    let result = bookings::book(
        &pool,
        &gateway_config(),
        &reservation_config(),
        &cancel,
        BookRequest {
            user_id,
            event_id,
            quantity: 2,
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(venue_reserve::error::Error::InsufficientHeld { requested: 2, found: 1 })
    ));
}

#[sqlx::test]
async fn booking_rejected_once_event_has_started(pool: PgPool) {
    let event_id = seed_event(&pool, 3, ChronoDuration::seconds(-60)).await;
    let user_id = seed_user(&pool).await;

    seats::hold(&pool, event_id, "S001", None).await.unwrap();

    let cancel = CancellationToken::new();
    let result = bookings::book(
        &pool,
        &gateway_config(),
        &reservation_config(),
        &cancel,
        BookRequest {
            user_id,
            event_id,
            quantity: 1,
        },
    )
    .await;

    assert!(matches!(result, Err(venue_reserve::error::Error::EventStarted)));
}

#[sqlx::test]
async fn cancel_restores_tickets_and_event_counter_round_trip(pool: PgPool) {
    let event_id = seed_event(&pool, 4, ChronoDuration::hours(1)).await;
    let user_id = seed_user(&pool).await;

    seats::hold(&pool, event_id, "S001", None).await.unwrap();
    seats::hold(&pool, event_id, "S002", None).await.unwrap();

    let cancel = CancellationToken::new();
    let booking = bookings::book(
        &pool,
        &gateway_config(),
        &reservation_config(),
        &cancel,
        BookRequest {
            user_id,
            event_id,
            quantity: 2,
        },
    )
    .await
    .unwrap();

    let available_before: i32 =
        sqlx::query_scalar("SELECT available_tickets FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(available_before, 2);

    let cancelled = bookings::cancel(&pool, booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let available_after: i32 =
        sqlx::query_scalar("SELECT available_tickets FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(available_after, 4);

    for ticket_id in &cancelled.ticket_ids {
        let status: TicketStatus =
            sqlx::query_scalar("SELECT status FROM tickets WHERE id = $1")
                .bind(ticket_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, TicketStatus::Available);
    }

    // Cancelling twice is rejected, not silently idempotent.
    let second = bookings::cancel(&pool, booking.id).await;
    assert!(matches!(second, Err(venue_reserve::error::Error::Validation(_))));
}

#[sqlx::test]
async fn release_is_idempotent(pool: PgPool) {
    let event_id = seed_event(&pool, 2, ChronoDuration::hours(1)).await;

    seats::hold(&pool, event_id, "S001", None).await.unwrap();
    seats::release(&pool, event_id, "S001").await.unwrap();
    // Second release on an already-available seat is a no-op, not an error.
    seats::release(&pool, event_id, "S001").await.unwrap();

    let status: TicketStatus = sqlx::query_scalar(
        "SELECT status FROM tickets WHERE event_id = $1 AND seat_no = 'S001'",
    )
    .bind(event_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, TicketStatus::Available);
}

#[sqlx::test]
async fn concurrent_holds_on_same_seat_exactly_one_wins(pool: PgPool) {
    let event_id = seed_event(&pool, 1, ChronoDuration::hours(1)).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            seats::hold(&pool, event_id, "S001", None).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
}

#[sqlx::test]
async fn hold_reaper_reclaims_stale_holds(pool: PgPool) {
    let event_id = seed_event(&pool, 2, ChronoDuration::hours(1)).await;
    seats::hold(&pool, event_id, "S001", None).await.unwrap();

    // Backdate the hold past the TTL the way an unattended hold ages.
    sqlx::query(
        "UPDATE tickets SET updated_at = NOW() - INTERVAL '10 minutes' \
         WHERE event_id = $1 AND seat_no = 'S001'",
    )
    .bind(event_id)
    .execute(&pool)
    .await
    .unwrap();

    let reclaimed = seats::reclaim_stale(&pool, Duration::from_secs(180))
        .await
        .unwrap();
    assert_eq!(reclaimed, 1);

    let status: TicketStatus = sqlx::query_scalar(
        "SELECT status FROM tickets WHERE event_id = $1 AND seat_no = 'S001'",
    )
    .bind(event_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, TicketStatus::Available);
}

#[sqlx::test]
async fn confirm_rejects_expired_booking(pool: PgPool) {
    let event_id = seed_event(&pool, 2, ChronoDuration::hours(1)).await;
    let user_id = seed_user(&pool).await;
    seats::hold(&pool, event_id, "S001", None).await.unwrap();

    let mut reservation = reservation_config();
    reservation.booking_ttl = Duration::from_secs(0);

    let cancel = CancellationToken::new();
    let booking = bookings::book(
        &pool,
        &gateway_config(),
        &reservation,
        &cancel,
        BookRequest {
            user_id,
            event_id,
            quantity: 1,
        },
    )
    .await
    .unwrap();

    // expires_at == now at creation time; by the time confirm runs it is past.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let result = bookings::confirm(&pool, booking.id).await;
    assert!(matches!(result, Err(venue_reserve::error::Error::Expired)));
}
