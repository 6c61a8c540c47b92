use super::model::UserRole;

/// Fields for creating a user. The password arrives in plaintext and is
/// hashed by the repository before it touches storage.
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Option<UserRole>,
}

/// Partial user update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// List query: search, filtering, sorting and pagination.
#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
}
