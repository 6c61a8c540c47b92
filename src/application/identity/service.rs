//! User management service — application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::{info, warn};

use super::tokens::{TokenPair, TokenService};
use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, UpdateUserDto, User,
    UserRepositoryInterface, UserRole,
};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::validations::validate_password_strength;
use crate::shared::PaginatedResult;

/// Deliberately identical for unknown users and wrong passwords, so the
/// response does not reveal which usernames exist.
const INVALID_CREDENTIALS: &str = "Incorrect username or password";

/// User service — orchestrates all identity / user-management use-cases.
///
/// Generic over `R: UserRepositoryInterface` so it stays decoupled from
/// the concrete persistence layer.
pub struct UserService<R: UserRepositoryInterface> {
    repo: Arc<R>,
    tokens: Arc<TokenService<R>>,
}

impl<R: UserRepositoryInterface> UserService<R> {
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService<R>>) -> Self {
        Self { repo, tokens }
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new user (default role: Viewer). The account starts
    /// active and unverified.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
        confirm_password: &str,
        role: Option<UserRole>,
    ) -> DomainResult<User> {
        if username.len() < 3 || username.len() > 50 {
            return Err(DomainError::Validation(
                "Username must be 3-50 characters".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(DomainError::Validation("Invalid email address".to_string()));
        }
        validate_password_strength(password)
            .map_err(|msg| DomainError::Validation(msg.to_string()))?;
        if password != confirm_password {
            return Err(DomainError::Validation("Passwords do not match".to_string()));
        }

        if self.repo.get_user_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict("Username already registered".to_string()));
        }
        if self.repo.get_user_by_email(email).await?.is_some() {
            return Err(DomainError::Conflict("Email already registered".to_string()));
        }

        let user = self
            .repo
            .create_user(CreateUserDto {
                username: username.to_string(),
                email: email.to_string(),
                full_name: full_name.to_string(),
                password: password.to_string(),
                role,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "New user registered");
        Ok(user)
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by username or email + password and issue a token pair.
    pub async fn login(&self, username_or_email: &str, password: &str) -> DomainResult<TokenPair> {
        let result = self.authenticate(username_or_email, password).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("auth_logins_total", "outcome" => outcome).increment(1);

        result
    }

    async fn authenticate(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> DomainResult<TokenPair> {
        let user = self
            .repo
            .get_user_by_login(username_or_email)
            .await?
            .ok_or_else(|| DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            return Err(DomainError::Inactive("Inactive user".to_string()));
        }

        if let Err(e) = self.repo.update_last_login(user.id).await {
            warn!(user_id = user.id, "could not record last login: {e}");
        }

        self.tokens.issue(&user).await
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        self.tokens.refresh(refresh_token).await
    }

    /// Best-effort logout: blacklist the access token and drop the stored
    /// refresh token. Never fails.
    pub async fn logout(&self, user_id: i32, access_token: &str) {
        self.tokens.revoke_access(access_token).await;
        self.tokens.revoke_session(user_id).await;
        info!(user_id, "User logged out");
    }

    // ── Queries ─────────────────────────────────────────────────

    /// List users with search, filtering, sorting and pagination.
    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repo.list_users(dto).await
    }

    /// Get a single user by ID.
    pub async fn get_user(&self, id: i32) -> DomainResult<User> {
        self.repo
            .get_user_by_id(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Apply a partial update. Callers decide which fields a given
    /// endpoint may pass (self-service is limited to email and full name,
    /// admins may also change role and active flag).
    pub async fn update_user(&self, id: i32, dto: UpdateUserDto) -> DomainResult<User> {
        self.repo
            .update_user(id, dto)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            })
    }

    /// Change a user's password. Verifies the current password first and
    /// revokes the stored refresh session so every device must log in again.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> DomainResult<()> {
        let valid = verify_password(current_password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        validate_password_strength(new_password)
            .map_err(|msg| DomainError::Validation(msg.to_string()))?;
        if new_password != confirm_password {
            return Err(DomainError::Validation("Passwords do not match".to_string()));
        }

        let new_hash = hash_password(new_password)
            .map_err(|e| DomainError::Internal(format!("failed to hash password: {e}")))?;

        self.repo.update_user_password(user.id, &new_hash).await?;
        self.tokens.revoke_session(user.id).await;

        info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Delete a user and purge their stored refresh token. Self-deletion is
    /// rejected so an admin cannot lock themselves out by accident.
    pub async fn delete_user(&self, id: i32, acting_user_id: i32) -> DomainResult<()> {
        if id == acting_user_id {
            return Err(DomainError::Validation(
                "Cannot delete your own account".to_string(),
            ));
        }

        self.repo.delete_user(id).await?;
        self.tokens.revoke_session(id).await;

        info!(user_id = id, "User deleted");
        Ok(())
    }
}
