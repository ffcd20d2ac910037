//! Request-scoped middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Access log: method, URI, status, and elapsed time for every request.
///
/// Logs after the inner handler completes, including requests answered by
/// the panic-recovery layer (which sits inside this wrapper). The response
/// comes back as a value here, so the status is read directly instead of
/// going through a status-capturing writer.
pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request handled"
    );

    response
}
