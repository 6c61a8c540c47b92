//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::dto::{
    ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenResponse,
    UpdateProfileRequest, UserResponse,
};
use crate::application::identity::UserService;
use crate::domain::{UpdateUserDto, UserRole};
use crate::infrastructure::database::repositories::UserRepository;
use crate::interfaces::http::common::{
    error_response, ApiResponse, MessageResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::{AuthenticatedUser, BearerToken};

/// Auth handler state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub user_service: Arc<UserService<UserRepository>>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation error or duplicate username/email")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ApiResponse<UserResponse>>)> {
    let role = match request.role.as_deref().map(str::parse::<UserRole>).transpose() {
        Ok(role) => role,
        Err(e) => return Err(error_response(e)),
    };

    match state
        .user_service
        .register(
            &request.username,
            &request.email,
            &request.full_name,
            &request.password,
            &request.confirm_password,
            role,
        )
        .await
    {
        Ok(user) => Ok(Json(ApiResponse::success(UserResponse::from(user)))),
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Inactive account"),
        (status = 401, description = "Incorrect credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, (StatusCode, Json<ApiResponse<TokenResponse>>)> {
    match state
        .user_service
        .login(&request.username, &request.password)
        .await
    {
        Ok(pair) => Ok(Json(ApiResponse::success(TokenResponse::from(pair)))),
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Authentication",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AuthHandlerState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, (StatusCode, Json<ApiResponse<TokenResponse>>)> {
    match state.user_service.refresh(&request.refresh_token).await {
        Ok(pair) => Ok(Json(ApiResponse::success(TokenResponse::from(pair)))),
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    State(state): State<AuthHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Json<ApiResponse<MessageResponse>> {
    state.user_service.logout(current.id(), &token).await;
    Json(ApiResponse::success(MessageResponse::new(
        "Successfully logged out",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    Extension(current): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::success(UserResponse::from(current.user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_current_user(
    State(state): State<AuthHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ApiResponse<UserResponse>>)> {
    // Self-service callers may only touch email and full name.
    let dto = UpdateUserDto {
        email: request.email,
        full_name: request.full_name,
        role: None,
        is_active: None,
    };

    match state.user_service.update_user(current.id(), dto).await {
        Ok(user) => Ok(Json(ApiResponse::success(UserResponse::from(user)))),
        Err(e) => Err(error_response(e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Wrong current password or weak new password"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn change_password(
    State(state): State<AuthHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, (StatusCode, Json<ApiResponse<MessageResponse>>)> {
    match state
        .user_service
        .change_password(
            &current.user,
            &request.current_password,
            &request.new_password,
            &request.confirm_password,
        )
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::success(MessageResponse::new(
            "Password changed successfully",
        )))),
        Err(e) => Err(error_response(e)),
    }
}
