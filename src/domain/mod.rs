//! Core business entities, types and traits

pub mod user;

pub use user::*;

// Re-export the shared error types under the domain namespace so that
// services and repositories can depend on `crate::domain` alone.
pub use crate::shared::types::errors::{DomainError, DomainResult};
