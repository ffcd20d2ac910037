//! Startup schema migrations.
//!
//! A fixed, ordered list of idempotent DDL statements executed once when the
//! process boots. Every statement is safe to re-run against an
//! already-migrated database, so there is no version bookkeeping.

use sqlx::PgPool;
use thiserror::Error;

/// Ordered DDL: the table must exist before its indexes.
///
/// The secondary indexes are redundant with the UNIQUE constraints but kept
/// for query-planner friendliness on lookups.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(255) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_username ON users (username)",
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users (email)",
];

/// Migration failure, identifying the failing statement's position.
#[derive(Debug, Error)]
#[error("migration {index} failed: {source}")]
pub struct MigrationError {
    /// Zero-based position in the migration list.
    pub index: usize,
    #[source]
    pub source: sqlx::Error,
}

/// Run the fixed migration list against the given pool.
///
/// Aborts on the first failing statement. No rollback is attempted: each
/// statement is individually atomic and idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    for (index, statement) in MIGRATIONS.iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|source| MigrationError { index, source })?;
        tracing::debug!(index, "migration statement applied");
    }
    Ok(())
}
