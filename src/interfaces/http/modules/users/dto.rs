//! User management DTOs

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Admin user update: unlike self-service, role and active flag are fair
/// game.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100, message = "full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    /// New role: admin, dba or viewer
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// List users query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Search by username or email
    pub search: Option<String>,
    /// Filter by role (admin, dba, viewer)
    pub role: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Sort field (username, email, role; default: newest first)
    pub sort_by: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}
