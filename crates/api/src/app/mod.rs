//! HTTP application wiring (axum router + middleware stack).
//!
//! This folder is structured like:
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `response.rs`: the uniform `{success, data, error}` envelope
//!
//! The middleware stack runs, outermost to innermost: access log, panic
//! recovery, CORS, then the router.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

use userdir_infra::UserStore;

use crate::middleware;

pub mod response;
pub mod routes;

/// Shared handler state.
///
/// The storage boundary is injected here (instead of a package-level
/// singleton) so tests can substitute the in-memory store.
pub struct AppState {
    pub store: Arc<dyn UserStore>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(store: Arc<dyn UserStore>) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route(
            "/health",
            get(routes::system::health).fallback(routes::method_not_allowed),
        )
        .nest("/api/v1/users", routes::users::router())
        .fallback(not_found)
        .layer(Extension(state))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::access_log))
                .layer(CatchPanicLayer::custom(handle_panic as fn(_) -> _))
                .layer(cors_layer()),
        )
}

/// Permissive CORS: any origin, method, and headers. Preflight OPTIONS
/// requests are answered by the layer without reaching the router.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Convert an unwound panic into a 500 envelope instead of killing the
/// connection task.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");

    response::respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Envelope-shaped 404 for unmatched paths.
async fn not_found() -> Response {
    response::respond_error(StatusCode::NOT_FOUND, "Not found")
}
