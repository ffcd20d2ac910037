use async_trait::async_trait;
use thiserror::Error;

use userdir_core::User;

/// Input for inserting a new user row.
///
/// The store assigns `id`, `created_at`, and `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

/// Partial update applied to an existing row.
///
/// `None` fields are left unmodified. `updated_at` is always refreshed,
/// whatever fields are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Storage operation error.
///
/// Uniqueness conflicts get a dedicated variant so the HTTP layer can map
/// them to a conflict response without inspecting driver error text.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(String),
}

/// CRUD boundary over the `users` table.
///
/// Implementations must enforce username/email uniqueness and surface
/// conflicts as `StoreError::UniqueViolation`. The handle is injected into
/// the HTTP layer so tests can substitute the in-memory implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users ordered by id ascending.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Insert a row with store-assigned id and timestamps.
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Fetch a row by id. `None` when the row does not exist.
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Apply a partial update, refreshing `updated_at`.
    ///
    /// Returns `None` when the row does not exist.
    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError>;

    /// Delete a row by id. `false` when the row did not exist.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Liveness probe against the backing storage.
    async fn ping(&self) -> Result<(), StoreError>;
}
