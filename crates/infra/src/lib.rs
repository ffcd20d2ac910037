//! `userdir-infra` — storage adapters for the user directory.
//!
//! Database-facing code lives here: the `UserStore` boundary, its Postgres
//! and in-memory implementations, and the startup migration runner.

pub mod migrations;
pub mod store;

pub use migrations::{MigrationError, run_migrations};
pub use store::{InMemoryUserStore, NewUser, PgUserStore, StoreError, UserPatch, UserStore};
