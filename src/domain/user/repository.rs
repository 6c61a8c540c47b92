use async_trait::async_trait;

use super::{CreateUserDto, GetUserDto, UpdateUserDto, User};
use crate::domain::DomainResult;
use crate::shared::PaginatedResult;

#[async_trait]
pub trait UserRepositoryInterface: Send + Sync {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User>;

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>>;
    async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    /// Single lookup matching either username or email (login form input).
    async fn get_user_by_login(&self, username_or_email: &str) -> DomainResult<Option<User>>;

    async fn update_user(&self, id: i32, dto: UpdateUserDto) -> DomainResult<Option<User>>;
    async fn update_user_password(&self, id: i32, new_password_hash: &str) -> DomainResult<()>;
    async fn update_last_login(&self, id: i32) -> DomainResult<()>;
    async fn delete_user(&self, id: i32) -> DomainResult<()>;
}
