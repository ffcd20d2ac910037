//! The `User` entity and its request shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A directory user.
///
/// `id` is assigned by storage; `created_at`/`updated_at` are set by the
/// service at insert time, with `updated_at` refreshed on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a user. Both fields are required.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

/// Request body for updating a user.
///
/// Absent (or empty) fields leave the stored column unmodified; at least one
/// field must carry a value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.is_empty() {
            return Err(DomainError::validation("username is required"));
        }
        if self.email.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        Ok(())
    }
}

impl UpdateUserRequest {
    /// The requested username, treating an empty string as absent.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|s| !s.is_empty())
    }

    /// The requested email, treating an empty string as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.username().is_none() && self.email().is_none() {
            return Err(DomainError::validation(
                "at least one field must be provided",
            ));
        }
        Ok(())
    }
}
