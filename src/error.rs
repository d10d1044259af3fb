//! Core error type shared by the Seat Registry, Booking Engine and
//! Transactional Gateway. Every fallible core operation returns `Result<T, Error>`;
//! the HTTP layer is the only place that turns a variant into a status code.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("event has already started")]
    EventStarted,

    #[error("insufficient held seats: requested {requested}, found {found}")]
    InsufficientHeld { requested: i64, found: i64 },

    #[error("seat not available: current status is {current_status}")]
    Conflict { current_status: String },

    #[error("booking has expired")]
    Expired,

    #[error("invariant violation: {0}")]
    Inconsistent(String),

    #[error("transient database conflict: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classifies a `sqlx::Error` as transient (deadlock, serialization
    /// failure, connection reset/timeout) or not. Only transient errors
    /// are retried by `run_with_retry`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            return Error::Transient(err.to_string());
        }
        match err {
            sqlx::Error::RowNotFound => Error::NotFound,
            other => Error::Internal(other.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::EventStarted => StatusCode::BAD_REQUEST,
            Error::InsufficientHeld { .. } => StatusCode::BAD_REQUEST,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Expired => StatusCode::BAD_REQUEST,
            Error::Inconsistent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Error::NotFound => "not_found",
            Error::Validation(_) => "validation",
            Error::EventStarted => "event_started",
            Error::InsufficientHeld { .. } => "insufficient_held",
            Error::Conflict { .. } => "conflict",
            Error::Expired => "expired",
            Error::Inconsistent(_) => "inconsistent",
            Error::Transient(_) => "transient",
            Error::Internal(_) => "internal",
        }
    }
}

/// Postgres SQLSTATE codes for deadlock and serialization-failure, plus
/// pool/connection level timeouts.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some("40001") | Some("40P01")
        ),
        _ => false,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "core operation failed");
        } else {
            tracing::debug!(error = %self, "core operation rejected");
        }
        let body = Json(json!({
            "success": false,
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
