use axum::http::StatusCode;
use axum::response::Response;

use crate::app::response;

pub mod system;
pub mod users;

/// Envelope-shaped 405 for unsupported methods on a matched path.
pub async fn method_not_allowed() -> Response {
    response::respond_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
