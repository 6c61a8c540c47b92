//! Infrastructure layer - external concerns

pub mod cache;
pub mod crypto;
pub mod database;

pub use database::{init_database, DatabaseConfig};
