//! Postgres-backed user store.
//!
//! ## Error mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx error | SQLSTATE | StoreError | Scenario |
//! |------------|----------|------------|----------|
//! | Database (unique violation) | `23505` | `UniqueViolation` | Duplicate username or email |
//! | Database (other) | any other | `Database` | Other database errors |
//! | PoolClosed / network / ... | n/a | `Database` | Connection-level failures |
//!
//! Conflict detection goes through the structured SQLSTATE code, never
//! through error-message text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use userdir_core::User;

use super::r#trait::{NewUser, StoreError, UserPatch, UserStore};

/// Postgres-backed `UserStore` over an sqlx connection pool.
///
/// The pool is `Send + Sync`; connection management and locking discipline
/// are delegated entirely to sqlx and the server.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, username, email, created_at, updated_at FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(decode_user(&row)?);
        }
        Ok(users)
    }

    #[instrument(skip(self, new_user), err)]
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, created_at, updated_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        decode_user(&row)
    }

    #[instrument(skip(self), err)]
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user", e))?;

        row.as_ref().map(decode_user).transpose()
    }

    #[instrument(skip(self, patch), err)]
    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        // Render the partial update with QueryBuilder: accumulate
        // `column = <bind>` pairs, no identifier concatenation.
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut assignments = builder.separated(", ");

        if let Some(username) = patch.username {
            assignments.push("username = ");
            assignments.push_bind_unseparated(username);
        }
        if let Some(email) = patch.email {
            assignments.push("email = ");
            assignments.push_bind_unseparated(email);
        }
        assignments.push("updated_at = ");
        assignments.push_bind_unseparated(Utc::now());

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id, username, email, created_at, updated_at");

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;

        row.as_ref().map(decode_user).transpose()
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                _ => StoreError::Database(msg),
            }
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_user(row: &sqlx::postgres::PgRow) -> Result<User, StoreError> {
    let row = UserRow::from_row(row)
        .map_err(|e| StoreError::Database(format!("failed to decode user row: {e}")))?;
    Ok(row.into())
}

#[derive(Debug)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
