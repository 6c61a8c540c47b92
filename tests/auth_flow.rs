//! End-to-end tests for the authentication API.
//!
//! Each test builds a full router over an in-memory SQLite database and an
//! in-process token cache, then drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;

use pganalytics::infrastructure::cache::{InMemoryTokenCache, TokenCache};
use pganalytics::infrastructure::crypto::jwt::JwtConfig;
use pganalytics::infrastructure::database::migrator::Migrator;
use pganalytics::create_api_router;

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let cache: Arc<dyn TokenCache> = Arc::new(InMemoryTokenCache::new());
    let jwt = JwtConfig {
        secret: "integration-test-secret".to_string(),
        ..JwtConfig::default()
    };
    let handle = PrometheusBuilder::new().build_recorder().handle();

    create_api_router(db, Some(cache), jwt, handle)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

fn register_body(username: &str, password: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "full_name": format!("{username} Example"),
        "password": password,
        "confirm_password": password,
    })
}

async fn register(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/auth/register",
        Some(register_body(username, password)),
        None,
    )
    .await
}

async fn register_with_role(app: &Router, username: &str, password: &str, role: &str) {
    let mut body = register_body(username, password);
    body["role"] = json!(role);
    let (status, _) = send(app, "POST", "/api/v1/auth/register", Some(body), None).await;
    assert_eq!(status, StatusCode::OK);
}

/// Login and return (access_token, refresh_token).
async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": username, "password": password})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn register_returns_public_profile_without_password_material() {
    let app = test_app().await;

    let (status, body) = register(&app, "alice", "Passw0rd1").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["username"], "alice");
    assert_eq!(data["email"], "alice@example.com");
    assert_eq!(data["role"], "viewer");
    assert_eq!(data["is_active"], true);
    assert_eq!(data["is_verified"], false);
    assert!(data.get("password").is_none());
    assert!(data.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_username_or_email_is_rejected() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;

    let (status, _) = register(&app, "alice", "Passw0rd1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Different username, same email
    let mut body = register_body("bob", "Passw0rd1");
    body["email"] = json!("alice@example.com");
    let (status, _) = send(&app, "POST", "/api/v1/auth/register", Some(body), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn weak_or_mismatched_passwords_are_rejected() {
    let app = test_app().await;

    for bad in ["short1A", "nouppercase1", "NOLOWERCASE1", "NoDigitsHere"] {
        let (status, _) = register(&app, "alice", bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "password {bad:?}");
    }

    let mut body = register_body("alice", "Passw0rd1");
    body["confirm_password"] = json!("Passw0rd2");
    let (status, _) = send(&app, "POST", "/api/v1/auth/register", Some(body), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;

    let (status_wrong, body_wrong) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "alice", "password": "WrongPass1"})),
        None,
    )
    .await;
    let (status_ghost, body_ghost) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "ghost", "password": "WrongPass1"})),
        None,
    )
    .await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_ghost, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong, body_ghost);
}

#[tokio::test]
async fn login_works_with_email_too() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;

    let (access, _) = login(&app, "alice@example.com", "Passw0rd1").await;
    let (status, body) = send(&app, "GET", "/api/v1/auth/me", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;
    let (access, _) = login(&app, "alice", "Passw0rd1").await;

    // Token works before logout...
    let (status, body) = send(&app, "GET", "/api/v1/auth/me", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let (status, _) = send(&app, "POST", "/api/v1/auth/logout", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);

    // ...and is rejected afterwards, although its expiry has not elapsed.
    let (status, _) = send(&app, "GET", "/api/v1/auth/me", None, Some(&access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_tokens_are_single_use() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;
    let (_, refresh) = login(&app, "alice", "Passw0rd1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        Some(json!({"refresh_token": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    // The superseded token is dead.
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        Some(json!({"refresh_token": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The newly issued one works exactly once more.
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        Some(json!({"refresh_token": new_refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_requires_current_password_and_revokes_sessions() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;
    let (access, refresh) = login(&app, "alice", "Passw0rd1").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/change-password",
        Some(json!({
            "current_password": "WrongPass1",
            "new_password": "NewPassw0rd1",
            "confirm_password": "NewPassw0rd1",
        })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Old password still valid after the failed attempt.
    login(&app, "alice", "Passw0rd1").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/change-password",
        Some(json!({
            "current_password": "Passw0rd1",
            "new_password": "NewPassw0rd1",
            "confirm_password": "NewPassw0rd1",
        })),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The stored refresh session is gone, old credentials fail, new work.
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        Some(json!({"refresh_token": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "alice", "password": "Passw0rd1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    login(&app, "alice", "NewPassw0rd1").await;
}

#[tokio::test]
async fn self_service_profile_update_is_field_restricted() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;
    let (access, _) = login(&app, "alice", "Passw0rd1").await;

    // A role field in the body is simply ignored for /me.
    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/auth/me",
        Some(json!({
            "email": "new-alice@example.com",
            "full_name": "Alice Liddell",
            "role": "admin",
        })),
        Some(&access),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "new-alice@example.com");
    assert_eq!(body["data"]["full_name"], "Alice Liddell");
    assert_eq!(body["data"]["role"], "viewer");
}

#[tokio::test]
async fn missing_or_malformed_bearer_is_unauthorized() {
    let app = test_app().await;

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, "Token not-a-bearer")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admins_cannot_manage_users() {
    let app = test_app().await;
    register(&app, "alice", "Passw0rd1").await;
    let (access, _) = login(&app, "alice", "Passw0rd1").await;

    let (status, _) = send(&app, "GET", "/api/v1/auth/users", None, Some(&access)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_list_get_update_and_delete_users() {
    let app = test_app().await;
    register_with_role(&app, "root", "Passw0rd1", "admin").await;
    register(&app, "alice", "Passw0rd1").await;
    let (admin_access, _) = login(&app, "root", "Passw0rd1").await;

    // List
    let (status, body) = send(&app, "GET", "/api/v1/auth/users", None, Some(&admin_access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let alice_id = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "alice")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    // Get by id, and a 404 for an unknown id
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/auth/users/{alice_id}"),
        None,
        Some(&admin_access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let (status, _) = send(&app, "GET", "/api/v1/auth/users/9999", None, Some(&admin_access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Promote alice to dba
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/auth/users/{alice_id}"),
        Some(json!({"role": "dba"})),
        Some(&admin_access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "dba");

    // Delete alice
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/auth/users/{alice_id}"),
        None,
        Some(&admin_access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "alice", "password": "Passw0rd1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_self_deletion_is_rejected() {
    let app = test_app().await;
    register_with_role(&app, "root", "Passw0rd1", "admin").await;
    let (admin_access, _) = login(&app, "root", "Passw0rd1").await;

    let (_, body) = send(&app, "GET", "/api/v1/auth/me", None, Some(&admin_access)).await;
    let admin_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/v1/auth/users/{admin_id}"),
        None,
        Some(&admin_access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn deactivated_users_are_locked_out() {
    let app = test_app().await;
    register_with_role(&app, "root", "Passw0rd1", "admin").await;
    register(&app, "alice", "Passw0rd1").await;
    let (admin_access, _) = login(&app, "root", "Passw0rd1").await;
    let (alice_access, _) = login(&app, "alice", "Passw0rd1").await;

    let (_, body) = send(&app, "GET", "/api/v1/auth/users", None, Some(&admin_access)).await;
    let alice_id = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "alice")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/auth/users/{alice_id}"),
        Some(json!({"is_active": false})),
        Some(&admin_access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Existing access token is refused by the session guard...
    let (status, _) = send(&app, "GET", "/api/v1/auth/me", None, Some(&alice_access)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // ...and a fresh login is refused too.
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        Some(json!({"username": "alice", "password": "Passw0rd1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["status"], "ok");
}
