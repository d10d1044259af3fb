//! mod.rs
//!
//! Root API routing module.

pub mod bookings;
pub mod events;
pub mod health;
pub mod response;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Assembles the application's router. `state` is accepted so callers
/// can pass it uniformly even though no middleware layer needs it
/// directly here; axum resolves `State<Arc<AppState>>` per-handler.
pub fn routes(_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .nest(
            "/api/v1",
            Router::new()
                .merge(events::routes())
                .merge(tickets::routes())
                .merge(bookings::routes()),
        )
}
