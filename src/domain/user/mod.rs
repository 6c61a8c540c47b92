//! User aggregate
//!
//! Contains the User entity, DTOs, and repository interface.

pub mod dto;
pub mod model;
pub mod repository;

pub use dto::{CreateUserDto, GetUserDto, UpdateUserDto};
pub use model::{User, UserRole};
pub use repository::UserRepositoryInterface;
