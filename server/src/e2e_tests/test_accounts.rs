//! Registration and login over HTTP.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_register() {
    let app = TestApp::new();
    let response = app.register(EMAIL, PASSWORD).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["email"], EMAIL);
    assert_eq!(response.body["is_active"], true);
    assert!(response.body.get("password_hash").is_none());
    assert!(!response.body.to_string().contains("argon2"));
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = TestApp::new();
    let response = app.register(EMAIL, "password1").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Insecure password");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::new();
    assert_eq!(app.register(EMAIL, PASSWORD).await.status, StatusCode::CREATED);

    let response = app.register(EMAIL, PASSWORD).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "conflict");
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = TestApp::new();
    app.register(EMAIL, PASSWORD).await;

    let wrong_password = app.login(EMAIL, "Wr0ng!Passw0rd").await;
    assert_eq!(wrong_password.status, StatusCode::FORBIDDEN);
    assert_eq!(wrong_password.body["message"], "E-mail or password wrong");
    assert!(wrong_password.refresh_cookie().is_none());

    let unknown = app.login("x@y.com", PASSWORD).await;
    assert_eq!(unknown.status, StatusCode::FORBIDDEN);
    assert_eq!(unknown.body, wrong_password.body);
}

#[tokio::test]
async fn test_login_short_input() {
    let app = TestApp::new();
    let response = app.login("a@", PASSWORD).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "bad_request");
}

#[tokio::test]
async fn test_login_malformed_body() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/auth/token",
            Call {
                body: Some(json!({ "email": EMAIL })),
                ..Call::default()
            },
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "invalid_payload");
}
