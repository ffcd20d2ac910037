//! Uniform JSON response envelope.
//!
//! Every endpoint answers with `{success, data, error}`; exactly one of
//! `data`/`error` is present, per the `success` flag. If serialization
//! fails after the status line is committed there is nothing left to do —
//! the write is abandoned.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// The envelope wrapping every payload or error message.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Write a success envelope with the given status and payload.
pub fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
        .into_response()
}

/// Write an error envelope with the given status and message.
pub fn respond_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}
