//! User management API handlers
//!
//! Admin-only CRUD endpoints. The admin gate runs in middleware, so these
//! handlers only deal with the use-case itself.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{ListUsersParams, UpdateUserRequest};
use crate::application::identity::UserService;
use crate::domain::{GetUserDto, UpdateUserDto, UserRole};
use crate::infrastructure::database::repositories::UserRepository;
use crate::interfaces::http::common::{
    error_response, ApiResponse, MessageResponse, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::auth::UserResponse;

/// User handler state — concrete over `UserRepository` for Axum
/// compatibility.
#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService<UserRepository>>,
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<PaginatedResponse<UserResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let role = match params.role.as_deref().map(str::parse::<UserRole>).transpose() {
        Ok(role) => role,
        Err(e) => return Err(error_response(e)),
    };

    let dto = GetUserDto {
        search: params.search,
        role,
        page: Some(params.page),
        page_size: Some(params.limit),
        sort_by: params.sort_by,
    };

    match state.user_service.list_users(dto).await {
        Ok(result) => {
            let items: Vec<UserResponse> =
                result.items.into_iter().map(UserResponse::from).collect();
            Ok(Json(PaginatedResponse::new(
                items,
                result.total,
                result.page,
                result.limit,
            )))
        }
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ApiResponse<UserResponse>>)> {
    match state.user_service.get_user(id).await {
        Ok(user) => Ok(Json(ApiResponse::success(UserResponse::from(user)))),
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ApiResponse<UserResponse>>)> {
    let role = match request.role.as_deref().map(str::parse::<UserRole>).transpose() {
        Ok(role) => role,
        Err(e) => return Err(error_response(e)),
    };

    let dto = UpdateUserDto {
        email: request.email,
        full_name: request.full_name,
        role,
        is_active: request.is_active,
    };

    match state.user_service.update_user(id, dto).await {
        Ok(user) => Ok(Json(ApiResponse::success(UserResponse::from(user)))),
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Cannot delete your own account"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, (StatusCode, Json<ApiResponse<MessageResponse>>)> {
    match state.user_service.delete_user(id, current.id()).await {
        Ok(()) => Ok(Json(ApiResponse::success(MessageResponse::new(
            "User deleted successfully",
        )))),
        Err(e) => Err(error_response(e)),
    }
}
