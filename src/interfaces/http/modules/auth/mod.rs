//! Authentication module — register, login, token refresh, logout,
//! profile and password change

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
