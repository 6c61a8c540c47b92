//! HTTP REST API interfaces
//!
//! - `middleware`: session guard (JWT + revocation) and admin gate
//! - `modules`: request handlers grouped by resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::create_api_router;
