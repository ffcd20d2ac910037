use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Response;

use crate::app::AppState;
use crate::app::response::{respond, respond_error};

/// GET /health — storage liveness probe.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => respond(
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "database": "connected",
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health probe failed");
            respond_error(StatusCode::SERVICE_UNAVAILABLE, "Database connection failed")
        }
    }
}
