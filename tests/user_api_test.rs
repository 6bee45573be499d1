mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{json_body, TestApp, ADMIN_PASSWORD};
use dealership_api::{entities::user::UserSummary, services::LoginResponse};

#[tokio::test]
async fn login_issues_a_usable_token() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/users/login",
            Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login: LoginResponse = json_body(response).await;
    assert!(login.user.is_admin);

    let me = app
        .request(Method::GET, "/users/me", None, Some(&login.token))
        .await;
    assert_eq!(me.status(), StatusCode::OK);
    let me: UserSummary = json_body(me).await;
    assert_eq!(me.username, "admin");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::new().await;

    let wrong = app
        .request(
            Method::POST,
            "/users/login",
            Some(json!({ "username": "admin", "password": "guess" })),
            None,
        )
        .await;
    let unknown = app
        .request(
            Method::POST,
            "/users/login",
            Some(json!({ "username": "nobody", "password": "guess" })),
            None,
        )
        .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong: Value = json_body(wrong).await;
    let unknown: Value = json_body(unknown).await;
    assert_eq!(wrong["message"], unknown["message"]);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;

    let response = app.clerk(Method::GET, "/users", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clerk(
            Method::DELETE,
            &format!("/users/{}", app.admin_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.admin(Method::GET, "/users", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<UserSummary> = json_body(response).await;
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn created_users_never_expose_the_password() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::POST,
            "/users",
            Some(json!({
                "fullname": "Carla Souza",
                "username": "carla",
                "email": "carla@example.com",
                "password": "s3cret!"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = json_body(response).await;
    assert_eq!(body["username"], "carla");
    assert!(body.get("password").is_none());

    let duplicate = app
        .admin(
            Method::POST,
            "/users",
            Some(json!({
                "fullname": "Carla Again",
                "username": "carla",
                "email": "carla2@example.com",
                "password": "s3cret!"
            })),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn seeding_only_happens_on_an_empty_table() {
    let app = TestApp::new().await;
    let seeded = app
        .state
        .services
        .users
        .seed_admin("root", "root-pass-123")
        .await
        .unwrap();
    assert!(!seeded);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_document_lists_the_car_routes() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = json_body(response).await;
    assert!(doc["paths"].get("/cars").is_some());
    assert!(doc["paths"].get("/cars/{id}").is_some());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn promotions_apply_to_tokens_already_issued() {
    let app = TestApp::new().await;
    let response = app.clerk(Method::GET, "/users", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .admin(
            Method::PUT,
            &format!("/users/{}", app.clerk_id),
            Some(json!({
                "fullname": "Counter Clerk",
                "username": "clerk",
                "email": "clerk@example.com",
                "is_admin": true
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clerk(Method::GET, "/users", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
