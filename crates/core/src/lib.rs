//! `userdir-core` — domain model for the user directory.
//!
//! This crate contains **pure domain** types (no IO, no HTTP, no storage).

pub mod error;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use user::{CreateUserRequest, UpdateUserRequest, User};
