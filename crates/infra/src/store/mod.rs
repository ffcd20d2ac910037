//! User storage boundary.
//!
//! This module defines an infrastructure-facing abstraction over the `users`
//! table without making any storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryUserStore;
pub use postgres::PgUserStore;
pub use r#trait::{NewUser, StoreError, UserPatch, UserStore};
