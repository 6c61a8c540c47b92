//! # PG Analytics Backend
//!
//! Authentication and session core of the PG Analytics PostgreSQL
//! monitoring stack.
//!
//! ## Architecture
//!
//! - **domain**: user aggregate, role rules and repository traits
//! - **application**: identity services (user management, token lifecycle)
//! - **infrastructure**: persistence (sea-orm), crypto (JWT + bcrypt),
//!   token cache (redis)
//! - **interfaces**: HTTP REST API (axum) with Swagger documentation
//! - **shared**: error taxonomy, pagination, validation helpers

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig};

// Re-export API router
pub use interfaces::http::create_api_router;
