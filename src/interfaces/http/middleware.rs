//! Authentication middleware for Axum
//!
//! The session guard resolves a bearer token into a live user before any
//! protected handler runs: revocation check (advisory), signature/expiry/
//! kind verification, then a user load with an active-account check. The
//! admin gate layers on top of it for admin-only routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::{DomainError, User, UserRepositoryInterface, UserRole};
use crate::application::identity::tokens::blacklist_key;
use crate::infrastructure::cache::TokenCache;
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenKind};
use crate::infrastructure::database::repositories::UserRepository;
use crate::interfaces::http::common::{status_for, ApiResponse};

/// State for the session guard.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
    pub repo: Arc<UserRepository>,
    pub cache: Option<Arc<dyn TokenCache>>,
}

/// The user resolved by [`auth_middleware`], available to handlers via
/// request extensions.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user: User,
}

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Raw bearer token of the current request (logout needs the exact string
/// to blacklist).
#[derive(Clone)]
pub struct BearerToken(pub String);

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

fn reject(err: DomainError) -> Response {
    (status_for(&err), Json(ApiResponse::<()>::error(err.to_string()))).into_response()
}

/// Session guard: requires a valid, unrevoked access token belonging to an
/// active user.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_token) else {
        return reject(DomainError::Unauthorized(
            "Missing authentication token".to_string(),
        ));
    };
    let token = token.to_string();

    // Revocation is advisory: an unreachable cache must not take the whole
    // API down, so the check is skipped on backend errors.
    if let Some(cache) = &state.cache {
        match cache.get(&blacklist_key(&token)).await {
            Ok(Some(_)) => {
                return reject(DomainError::Unauthorized(
                    "Token has been revoked".to_string(),
                ));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("token cache unreachable, skipping revocation check: {e}");
            }
        }
    }

    let claims = match verify_token(&token, TokenKind::Access, &state.jwt_config) {
        Ok(claims) => claims,
        Err(_) => {
            return reject(DomainError::Unauthorized(
                "Invalid authentication token".to_string(),
            ));
        }
    };

    let user = match state.repo.get_user_by_id(claims.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return reject(DomainError::Unauthorized(
                "Could not validate credentials".to_string(),
            ));
        }
        Err(e) => return reject(e),
    };

    if !user.is_active {
        return reject(DomainError::Inactive("Inactive user".to_string()));
    }

    request.extensions_mut().insert(BearerToken(token));
    request.extensions_mut().insert(AuthenticatedUser { user });

    next.run(request).await
}

/// Admin gate, layered after [`auth_middleware`]. Admins satisfy every role
/// requirement; everyone else needs an exact match.
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(current) if current.user.role.satisfies(&UserRole::Admin) => {
            next.run(request).await
        }
        Some(_) => reject(DomainError::Forbidden(
            "Operation requires admin role".to_string(),
        )),
        None => reject(DomainError::Unauthorized(
            "Missing authentication token".to_string(),
        )),
    }
}
