//! Business logic and use cases

pub mod identity;

pub use identity::{TokenPair, TokenService, UserService};
