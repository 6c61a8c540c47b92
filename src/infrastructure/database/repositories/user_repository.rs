use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, UpdateUserDto, User,
    UserRepositoryInterface, UserRole,
};
use crate::infrastructure::crypto::password::hash_password;
use crate::infrastructure::database::entities::user;
use crate::shared::PaginatedResult;

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::Dba => UserRole::Dba,
        user::UserRole::Viewer => UserRole::Viewer,
    }
}

fn domain_role_to_entity(role: &UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::Dba => user::UserRole::Dba,
        UserRole::Viewer => user::UserRole::Viewer,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        full_name: model.full_name,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        is_active: model.is_active,
        is_verified: model.is_verified,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Internal(format!("database error: {e}"))
}

fn unique_violation_to_conflict(e: sea_orm::DbErr) -> DomainError {
    let text = e.to_string();
    if text.contains("UNIQUE") || text.contains("unique") || text.contains("duplicate") {
        DomainError::Conflict("Username or email already exists".to_string())
    } else {
        db_err(e)
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepositoryInterface for UserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let now = Utc::now();

        let password_hash = hash_password(&dto.password)
            .map_err(|e| DomainError::Internal(format!("failed to hash password: {e}")))?;

        let role = dto
            .role
            .as_ref()
            .map_or(user::UserRole::Viewer, domain_role_to_entity);

        // A fresh registration is active but not yet verified.
        let new_user = user::ActiveModel {
            username: Set(dto.username),
            email: Set(dto.email),
            full_name: Set(dto.full_name),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            is_verified: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
            ..Default::default()
        };

        let model = new_user
            .insert(&self.db)
            .await
            .map_err(unique_violation_to_conflict)?;

        Ok(user_model_to_domain(model))
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let page = dto.page.unwrap_or(1).max(1);
        let page_size = dto.page_size.unwrap_or(20).clamp(1, 100);

        let mut query = user::Entity::find();

        // Search by username or email
        if let Some(ref search) = dto.search {
            query = query.filter(
                user::Column::Username
                    .contains(search)
                    .or(user::Column::Email.contains(search)),
            );
        }

        if let Some(ref role) = dto.role {
            query = query.filter(user::Column::Role.eq(domain_role_to_entity(role)));
        }

        match dto.sort_by.as_deref() {
            Some("username") => {
                query = query.order_by_asc(user::Column::Username);
            }
            Some("email") => {
                query = query.order_by_asc(user::Column::Email);
            }
            Some("role") => {
                query = query.order_by_asc(user::Column::Role);
            }
            _ => {
                query = query.order_by_desc(user::Column::CreatedAt);
            }
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let offset = ((page - 1) * page_size) as u64;
        let models = query
            .offset(offset)
            .limit(page_size as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let items: Vec<User> = models.into_iter().map(user_model_to_domain).collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_login(&self, username_or_email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(
                user::Column::Username
                    .eq(username_or_email)
                    .or(user::Column::Email.eq(username_or_email)),
            )
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn update_user(&self, id: i32, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();

        if let Some(email) = dto.email {
            active.email = Set(email);
        }
        if let Some(full_name) = dto.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(role) = dto.role {
            active.role = Set(domain_role_to_entity(&role));
        }
        if let Some(is_active) = dto.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(unique_violation_to_conflict)?;

        Ok(Some(user_model_to_domain(updated)))
    }

    async fn update_user_password(&self, id: i32, new_password_hash: &str) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        };

        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(new_password_hash.to_string());
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn update_last_login(&self, id: i32) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        };

        let mut active: user::ActiveModel = existing.into();
        active.last_login_at = Set(Some(Utc::now()));
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn delete_user(&self, id: i32) -> DomainResult<()> {
        let result = user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: id.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::Migrator;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    async fn repo() -> UserRepository {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        UserRepository::new(db)
    }

    fn dto(username: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password: "Passw0rd1".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn creates_user_with_defaults() {
        let repo = repo().await;
        let user = repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        assert!(user.id > 0);
        assert_eq!(user.role, UserRole::Viewer);
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert_ne!(user.password_hash, "Passw0rd1");
        assert!(user.last_login_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let repo = repo().await;
        repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        let err = repo
            .create_user(dto("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = repo().await;
        repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        let err = repo
            .create_user(dto("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn finds_user_by_username_or_email() {
        let repo = repo().await;
        repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        assert!(repo.get_user_by_login("alice").await.unwrap().is_some());
        assert!(repo
            .get_user_by_login("alice@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(repo.get_user_by_login("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updates_selected_fields_only() {
        let repo = repo().await;
        let user = repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        let updated = repo
            .update_user(
                user.id,
                UpdateUserDto {
                    full_name: Some("Alice Liddell".to_string()),
                    role: Some(UserRole::Dba),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.full_name, "Alice Liddell");
        assert_eq!(updated.role, UserRole::Dba);
        assert_eq!(updated.email, "alice@example.com");
    }

    #[tokio::test]
    async fn update_of_missing_user_returns_none() {
        let repo = repo().await;
        let result = repo.update_user(999, UpdateUserDto::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_supports_search_and_pagination() {
        let repo = repo().await;
        for i in 0..5 {
            repo.create_user(dto(&format!("user{i}"), &format!("user{i}@example.com")))
                .await
                .unwrap();
        }
        repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        let all = repo.list_users(GetUserDto::default()).await.unwrap();
        assert_eq!(all.total, 6);

        let page = repo
            .list_users(GetUserDto {
                page: Some(2),
                page_size: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);

        let found = repo
            .list_users(GetUserDto {
                search: Some("alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].username, "alice");
    }

    #[tokio::test]
    async fn delete_of_missing_user_is_not_found() {
        let repo = repo().await;
        let err = repo.delete_user(42).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn records_last_login() {
        let repo = repo().await;
        let user = repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        repo.update_last_login(user.id).await.unwrap();

        let reloaded = repo.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(reloaded.last_login_at.is_some());
    }
}
