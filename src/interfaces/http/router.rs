//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::identity::{TokenService, UserService};
use crate::infrastructure::cache::TokenCache;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::repositories::UserRepository;
use crate::interfaces::http::common::{ApiResponse, MessageResponse, PaginatedResponse};
use crate::interfaces::http::middleware::{admin_middleware, auth_middleware, AuthState};
use crate::interfaces::http::modules::{auth, health, metrics, request_id, users};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::refresh_token,
        auth::logout,
        auth::get_current_user,
        auth::update_current_user,
        auth::change_password,
        // Users (admin)
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            MessageResponse,
            PaginatedResponse<auth::UserResponse>,
            // Auth
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::RefreshTokenRequest,
            auth::TokenResponse,
            auth::ChangePasswordRequest,
            auth::UpdateProfileRequest,
            auth::UserResponse,
            // Users
            users::UpdateUserRequest,
            // Health
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Authentication", description = "User authentication: registration, login (JWT pair), token refresh, logout, profile, password change"),
        (name = "Users", description = "User management (admin only)"),
    ),
    info(
        title = "PG Analytics API",
        version = "0.1.0",
        description = "Authentication and session API for the PG Analytics PostgreSQL monitoring stack",
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(
    db: DatabaseConnection,
    cache: Option<Arc<dyn TokenCache>>,
    jwt_config: JwtConfig,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let repo = Arc::new(UserRepository::new(db.clone()));
    let token_service = Arc::new(TokenService::new(
        repo.clone(),
        cache.clone(),
        jwt_config.clone(),
    ));
    let user_service = Arc::new(UserService::new(repo.clone(), token_service));

    let guard_state = AuthState {
        jwt_config,
        repo,
        cache,
    };

    let auth_state = auth::AuthHandlerState {
        user_service: user_service.clone(),
    };
    let user_state = users::UserHandlerState { user_service };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes (public)
    let auth_public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh_token))
        .with_state(auth_state.clone());

    // Auth routes (session required)
    let auth_protected = Router::new()
        .route("/logout", post(auth::logout))
        .route(
            "/me",
            get(auth::get_current_user).put(auth::update_current_user),
        )
        .route("/change-password", post(auth::change_password))
        .layer(middleware::from_fn_with_state(
            guard_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // User management (admin gate on top of the session guard; the last
    // layer added runs first)
    let admin_users = Router::new()
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(guard_state, auth_middleware))
        .with_state(user_state);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db,
            started_at: Arc::new(Instant::now()),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics::MetricsState {
            handle: prometheus_handle,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/auth", auth_public)
        .nest("/api/v1/auth", auth_protected)
        .nest("/api/v1/auth/users", admin_users)
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
