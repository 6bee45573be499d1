#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use dealership_api::{
    app_router,
    config::AppConfig,
    db,
    services::{LoginRequest, UserInput},
    validation::FixedClock,
    AppState,
};

pub const ADMIN_PASSWORD: &str = "admin-pass-123";
pub const CLERK_PASSWORD: &str = "clerk-pass-123";

/// "Now" for every test application.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

/// Application backed by a throwaway SQLite file, with one administrator and
/// one regular user already logged in.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_id: i32,
    pub admin_token: String,
    pub clerk_id: i32,
    pub clerk_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("dealership_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::connect_with(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state =
            AppState::with_clock(Arc::new(pool), cfg, Arc::new(FixedClock(test_now())));

        let users = state.services.users.clone();
        let admin = users
            .create(UserInput {
                fullname: "Admin".into(),
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: Some(ADMIN_PASSWORD.into()),
                is_admin: true,
            })
            .await
            .expect("seed admin");
        let clerk = users
            .create(UserInput {
                fullname: "Clerk".into(),
                username: "clerk".into(),
                email: "clerk@example.com".into(),
                password: Some(CLERK_PASSWORD.into()),
                is_admin: false,
            })
            .await
            .expect("seed clerk");

        let admin_token = users
            .login(LoginRequest {
                username: "admin".into(),
                password: ADMIN_PASSWORD.into(),
            })
            .await
            .expect("admin login")
            .token;
        let clerk_token = users
            .login(LoginRequest {
                username: "clerk".into(),
                password: CLERK_PASSWORD.into(),
            })
            .await
            .expect("clerk login")
            .token;

        Self {
            router: app_router(state.clone()),
            state,
            admin_id: admin.id,
            admin_token,
            clerk_id: clerk.id,
            clerk_token,
            _dir: dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as the administrator.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.admin_token)).await
    }

    /// Request as the regular user.
    pub async fn clerk(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.clerk_token)).await
    }

    /// Creates a customer through the API and returns its id.
    pub async fn create_customer(&self, name: &str, document: &str) -> i32 {
        let response = self
            .admin(Method::POST, "/customers", Some(customer_body(name, document)))
            .await;
        assert_eq!(response.status(), 201, "customer seed failed");
        id_from_location(&response)
    }

    /// Creates a car through the API as `token` and returns its id.
    pub async fn create_car(&self, body: Value, token: &str) -> i32 {
        let response = self
            .request(Method::POST, "/cars", Some(body), Some(token))
            .await;
        assert_eq!(response.status(), 201, "car seed failed");
        id_from_location(&response)
    }
}

pub fn id_from_location(response: &Response) -> i32 {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit('/').next())
        .and_then(|id| id.parse().ok())
        .expect("location header with an id")
}

pub async fn json_body<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub fn car_body() -> Value {
    json!({
        "brand": "FIAT",
        "model": "UNO",
        "color": "AZUL",
        "year_manufacture": 2015,
        "imported": false,
        "plates": "ABC-1234"
    })
}

pub fn customer_body(name: &str, document: &str) -> Value {
    json!({
        "name": name,
        "ident_document": document,
        "birth_date": "1990-05-17",
        "street_name": "Rua das Flores",
        "house_number": "100",
        "district": "Centro",
        "municipality": "Franca",
        "state": "SP",
        "phone": "(16) 99999-0000",
        "email": "customer@example.com"
    })
}

/// Field names of the `validationErrors` array in an error body.
pub fn violated_fields(body: &Value) -> Vec<String> {
    body["validationErrors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
