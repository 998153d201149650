use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use deskarr::config::Config;
use deskarr::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "integrationAdminPass1!";
const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single connection keeps the in-memory database shared.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.auth.bootstrap_admin_password = Some(ADMIN_PASSWORD.to_string());
    config
}

async fn spawn_app_with(config: Config) -> Router {
    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create shared state"),
    );
    shared
        .account_service
        .ensure_default_admin()
        .await
        .expect("Failed to bootstrap admin");

    let state = deskarr::api::create_app_state(shared);
    deskarr::api::router(state)
}

async fn spawn_app() -> Router {
    spawn_app_with(test_config()).await
}

fn client_addr(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, last_octet], 40000))
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .extension(ConnectInfo(client_addr(1)))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json");

    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"username": username, "password": password}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_user(app: &Router, admin_token: &str, username: &str, password: &str) -> i32 {
    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/v1/auth/users",
            admin_token,
            Some(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": password,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    i32::try_from(body["data"]["id"].as_i64().unwrap()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "up");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = spawn_app().await;

    let token = login(&app, "admin", ADMIN_PASSWORD).await;

    let response = app
        .oneshot(authed_request("GET", "/api/v1/auth/me", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_login_rejections_are_indistinguishable() {
    let app = spawn_app().await;

    let wrong_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"username": "admin", "password": "wrong-password"}),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = body_json(wrong_password).await;

    let unknown_user = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"username": "nobody", "password": "wrong-password"}),
        ))
        .await
        .unwrap();
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = body_json(unknown_user).await;

    // Same error body for unknown user and wrong password.
    assert_eq!(wrong_password["error"], unknown_user["error"]);
}

#[tokio::test]
async fn test_auth_gate_rejects_bad_tokens() {
    let app = spawn_app().await;

    // No Authorization header
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header("Authorization", "Basic abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Empty bearer token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header("Authorization", "Bearer ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/v1/auth/me", "not.a.jwt", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_gets_403_on_admin_routes() {
    let app = spawn_app().await;
    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    create_user(&app, &admin_token, "regular", "regularPass123").await;
    let user_token = login(&app, "regular", "regularPass123").await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "GET",
            "/api/v1/auth/users",
            &user_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // But the non-admin surface still works with the same token.
    let response = app
        .oneshot(authed_request("GET", "/api/v1/auth/me", &user_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_user_conflict() {
    let app = spawn_app().await;
    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    create_user(&app, &admin_token, "duplicate", "somePassword1").await;

    // Same username, different email
    let response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/v1/auth/users",
            &admin_token,
            Some(&json!({
                "username": "duplicate",
                "email": "other@example.com",
                "password": "somePassword1",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Different username, same email
    let response = app
        .oneshot(authed_request(
            "POST",
            "/api/v1/auth/users",
            &admin_token,
            Some(&json!({
                "username": "someone-else",
                "email": "duplicate@example.com",
                "password": "somePassword1",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_users_clamps_pagination() {
    let app = spawn_app().await;
    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    let response = app
        .oneshot(authed_request(
            "GET",
            "/api/v1/auth/users?page=-3&page_size=5000",
            &admin_token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["page_size"], 20);
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = spawn_app().await;
    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    create_user(&app, &admin_token, "changer", "originalPass1").await;
    let token = login(&app, "changer", "originalPass1").await;

    // Wrong current password leaves the hash untouched.
    let response = app
        .clone()
        .oneshot(authed_request(
            "PATCH",
            "/api/v1/auth/password",
            &token,
            Some(&json!({
                "current_password": "wrong-password",
                "new_password": "replacementPass1",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(authed_request(
            "PATCH",
            "/api/v1/auth/password",
            &token,
            Some(&json!({
                "current_password": "originalPass1",
                "new_password": "replacementPass1",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works, new one does.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"username": "changer", "password": "originalPass1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    login(&app, "changer", "replacementPass1").await;
}

#[tokio::test]
async fn test_deactivated_account_is_locked_out() {
    let app = spawn_app().await;
    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    let id = create_user(&app, &admin_token, "suspended", "suspendedPass1").await;
    let user_token = login(&app, "suspended", "suspendedPass1").await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "PATCH",
            &format!("/api/v1/auth/users/{id}"),
            &admin_token,
            Some(&json!({"is_active": false})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The still-valid token stops working immediately.
    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/v1/auth/me", &user_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // And login with correct credentials is refused too.
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"username": "suspended", "password": "suspendedPass1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_account_is_gone() {
    let app = spawn_app().await;
    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    let id = create_user(&app, &admin_token, "doomed", "doomedPass123").await;
    let user_token = login(&app, "doomed", "doomedPass123").await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/v1/auth/users/{id}"),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/api/v1/auth/users/{id}"),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/v1/auth/me", &user_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Deleting again is a 404, not a 204.
    let response = app
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/v1/auth/users/{id}"),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn support_request_body() -> Value {
    json!({
        "type": "bug_report",
        "user_email": "reporter@example.com",
        "message": "The app crashes when I rotate my phone",
        "platform": "iOS",
        "app_version": "2.4.1",
        "device_model": "iPhone 15",
        "app": "support-app",
    })
}

fn intake_request(last_octet: u8) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/support-request")
        .header("Content-Type", "application/json")
        .extension(ConnectInfo(client_addr(last_octet)))
        .body(Body::from(support_request_body().to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_support_request_lifecycle() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(intake_request(1)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["status"], "new");
    assert_eq!(body["data"]["type"], "bug_report");

    let admin_token = login(&app, "admin", ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(authed_request(
            "PATCH",
            &format!("/api/v1/support-requests/{id}"),
            &admin_token,
            Some(&json!({"status": "in_progress", "admin_notes": "Looking into it"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(body["data"]["admin_notes"], "Looking into it");

    let response = app
        .clone()
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/v1/support-requests/{id}"),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Soft-deleted tickets are invisible afterwards.
    let response = app
        .oneshot(authed_request(
            "GET",
            &format!("/api/v1/support-requests/{id}"),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_support_request_listing_requires_admin() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/support-requests")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_support_request_rate_limited_per_client() {
    let mut config = test_config();
    // Tiny burst and near-zero refill so the fourth request must fail.
    config.rate_limit.burst = 3;
    config.rate_limit.requests_per_second = 0.001;
    let app = spawn_app_with(config).await;

    for _ in 0..3 {
        let response = app.clone().oneshot(intake_request(10)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.clone().oneshot(intake_request(10)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);

    // A different client address still has a full bucket.
    let response = app.oneshot(intake_request(11)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rate_limit_does_not_cover_login() {
    let mut config = test_config();
    config.rate_limit.burst = 1;
    config.rate_limit.requests_per_second = 0.001;
    let app = spawn_app_with(config).await;

    let response = app.clone().oneshot(intake_request(20)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app.clone().oneshot(intake_request(20)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Login from the same address is unaffected by the exhausted bucket.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header("Content-Type", "application/json")
                .extension(ConnectInfo(client_addr(20)))
                .body(Body::from(
                    json!({"username": "admin", "password": ADMIN_PASSWORD}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_support_request_rejected() {
    let app = spawn_app().await;

    let mut body = support_request_body();
    body["message"] = json!("   ");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/support-request")
                .header("Content-Type", "application/json")
                .extension(ConnectInfo(client_addr(30)))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown ticket type is rejected at deserialization.
    let mut body = support_request_body();
    body["type"] = json!("complaint");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/support-request")
                .header("Content-Type", "application/json")
                .extension(ConnectInfo(client_addr(30)))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_bootstrap_admin_is_idempotent() {
    let config = test_config();
    let shared = Arc::new(SharedState::new(config).await.unwrap());

    shared.account_service.ensure_default_admin().await.unwrap();
    shared.account_service.ensure_default_admin().await.unwrap();

    let (accounts, total) = shared.account_service.list_paged(1, 20).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(accounts[0].username, "admin");
}
