use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};

use userdir_core::{CreateUserRequest, UpdateUserRequest};
use userdir_infra::{NewUser, StoreError, UserPatch};

use crate::app::AppState;
use crate::app::response::{respond, respond_error};
use crate::app::routes::method_not_allowed;

/// Router for the /users collection and item endpoints.
pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_users)
                .post(create_user)
                .fallback(method_not_allowed),
        )
        .route(
            "/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        )
}

/// GET / — all users, ordered by id. No pagination: the whole table is
/// materialized into the response.
async fn list_users(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.store.list().await {
        Ok(users) => respond(StatusCode::OK, users),
        Err(err) => {
            tracing::error!(error = %err, "list users failed");
            respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch users")
        }
    }
}

/// POST / — create a user from a validated request body.
async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return respond_error(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    if let Err(err) = req.validate() {
        return respond_error(StatusCode::BAD_REQUEST, err.to_string());
    }

    let new_user = NewUser {
        username: req.username,
        email: req.email,
    };

    match state.store.insert(new_user).await {
        Ok(user) => respond(StatusCode::CREATED, user),
        Err(StoreError::UniqueViolation(_)) => respond_error(
            StatusCode::CONFLICT,
            "User with this username or email already exists",
        ),
        Err(err) => {
            tracing::error!(error = %err, "create user failed");
            respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user")
        }
    }
}

/// GET /{id} — fetch a single user.
async fn get_user(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id: i64 = match id.parse() {
        Ok(v) => v,
        Err(_) => return respond_error(StatusCode::BAD_REQUEST, "Invalid user ID"),
    };

    match state.store.find(id).await {
        Ok(Some(user)) => respond(StatusCode::OK, user),
        Ok(None) => respond_error(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            tracing::error!(error = %err, user_id = id, "fetch user failed");
            respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch user")
        }
    }
}

/// PUT /{id} — partial update; only provided fields are touched.
async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Response {
    let id: i64 = match id.parse() {
        Ok(v) => v,
        Err(_) => return respond_error(StatusCode::BAD_REQUEST, "Invalid user ID"),
    };

    let Ok(Json(req)) = body else {
        return respond_error(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    if let Err(err) = req.validate() {
        return respond_error(StatusCode::BAD_REQUEST, err.to_string());
    }

    let patch = UserPatch {
        username: req.username().map(str::to_string),
        email: req.email().map(str::to_string),
    };

    match state.store.update(id, patch).await {
        Ok(Some(user)) => respond(StatusCode::OK, user),
        Ok(None) => respond_error(StatusCode::NOT_FOUND, "User not found"),
        Err(StoreError::UniqueViolation(_)) => respond_error(
            StatusCode::CONFLICT,
            "User with this username or email already exists",
        ),
        Err(err) => {
            tracing::error!(error = %err, user_id = id, "update user failed");
            respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update user")
        }
    }
}

/// DELETE /{id} — remove a user.
async fn delete_user(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id: i64 = match id.parse() {
        Ok(v) => v,
        Err(_) => return respond_error(StatusCode::BAD_REQUEST, "Invalid user ID"),
    };

    match state.store.delete(id).await {
        Ok(true) => respond(
            StatusCode::OK,
            serde_json::json!({ "message": "User deleted successfully" }),
        ),
        Ok(false) => respond_error(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            tracing::error!(error = %err, user_id = id, "delete user failed");
            respond_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete user")
        }
    }
}
