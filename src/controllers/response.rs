//! Uniform success envelope: `{success, data?, error?, message?}`. The
//! error half of the envelope is produced once, centrally, by
//! `Error`'s `IntoResponse` impl (see `crate::error`) rather than
//! per-handler.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "success": true, "data": self.data }))).into_response()
    }
}
