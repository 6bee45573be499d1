use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use dealership_api::{
    client::{CarApi, ClientError, DealershipClient, LoginAttempt},
    validation::{CarInput, Color},
};

fn input() -> CarInput {
    CarInput {
        brand: "FIAT".into(),
        model: "UNO".into(),
        color: Color::Azul,
        year_manufacture: 2015,
        imported: false,
        plates: "ABC-1234".into(),
        selling_date: None,
        selling_price: None,
        customer_id: Some(3),
    }
}

fn login_body(token: &str) -> serde_json::Value {
    json!({
        "token": token,
        "user": {
            "id": 1,
            "fullname": "Admin",
            "username": "admin",
            "email": "admin@example.com",
            "is_admin": true
        }
    })
}

#[tokio::test]
async fn login_keeps_the_token_for_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .and(body_partial_json(json!({ "username": "admin" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("tok-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = DealershipClient::new(server.uri()).unwrap();
    let login = client.login("admin", "secret").await.unwrap();
    assert_eq!(login.user.username, "admin");
    assert_eq!(client.token(), Some("tok-1"));

    assert!(client.list_customers().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_reads_the_id_from_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cars"))
        .and(body_partial_json(json!({ "color": "AZUL", "customer_id": 3 })))
        .respond_with(ResponseTemplate::new(201).insert_header("location", "/cars/17"))
        .mount(&server)
        .await;

    let client = DealershipClient::new(server.uri()).unwrap().with_token("t");
    assert_eq!(client.create_car(&input()).await.unwrap(), Some(17));
}

#[tokio::test]
async fn validation_bodies_decode_into_violations() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/cars/5"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Bad Request",
            "message": "Validation failed",
            "validationErrors": [
                {
                    "field": "plates",
                    "code": "format",
                    "message": "Plates must follow the AAA-9999 or AAA-9A99 format."
                }
            ],
            "timestamp": "2025-06-15T12:00:00+00:00"
        })))
        .mount(&server)
        .await;

    let client = DealershipClient::new(server.uri()).unwrap().with_token("t");
    let err = client.update_car(5, &input()).await.unwrap_err();
    assert_matches!(err, ClientError::Validation(violations) if violations[0].field == "plates");
}

#[tokio::test]
async fn missing_cars_and_server_errors_are_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cars/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Not Found",
            "message": "Not found: Car 404 not found",
            "timestamp": "2025-06-15T12:00:00+00:00"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cars/500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = DealershipClient::new(server.uri()).unwrap().with_token("t");
    assert_matches!(
        client.get_car(404).await,
        Err(ClientError::NotFound(message)) if message.contains("Car 404")
    );
    assert_matches!(
        client.get_car(500).await,
        Err(ClientError::Status { status, .. }) if status.as_u16() == 500
    );
}

#[tokio::test]
async fn rejected_logins_are_a_miss_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .and(body_partial_json(json!({ "password": "right" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("tok")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "message": "Unauthorized: Invalid username or password",
            "timestamp": "2025-06-15T12:00:00+00:00"
        })))
        .mount(&server)
        .await;

    let client = DealershipClient::new(server.uri()).unwrap();
    assert!(!client.try_login("admin", "wrong").await.unwrap());
    assert!(client.try_login("admin", "right").await.unwrap());
}
