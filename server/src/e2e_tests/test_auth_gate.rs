//! Bearer handling on required and optional route groups.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_missing_bearer_on_required_route() {
    let app = TestApp::new();
    let response = app.call(Method::GET, "/cards", Call::default()).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["code"], "forbidden");
    assert_eq!(response.body["message"], "Please authenticate");
}

#[tokio::test]
async fn test_invalid_bearer() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::GET,
            "/cards",
            Call {
                bearer: Some("eyJhbGciOiJSUzI1NiJ9.e30.c2ln"),
                ..Call::default()
            },
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "unauthorized");
    assert_eq!(response.body["message"], "failed to verify token");
}

#[tokio::test]
async fn test_expired_bearer() {
    let app = TestApp::new();
    let (token, _) = app.sign_up(EMAIL).await;

    app.clock.advance(3601);
    let response = app
        .call(
            Method::GET,
            "/cards",
            Call {
                bearer: Some(&token),
                ..Call::default()
            },
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "token_expired");
}

#[tokio::test]
async fn test_optional_route_accepts_anonymous() {
    let app = TestApp::new();

    let anonymous = app.call(Method::POST, "/cards/new", Call::default()).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert!(anonymous.body["data"].as_str().is_some_and(|d| !d.is_empty()));
    assert!(anonymous.body["key"].as_str().is_some_and(|k| !k.is_empty()));

    let (token, _) = app.sign_up(EMAIL).await;
    let signed_in = app
        .call(
            Method::POST,
            "/cards/new",
            Call {
                body: Some(json!({ "include_symbols": true, "digits_area": true })),
                bearer: Some(&token),
                ..Call::default()
            },
        )
        .await;
    assert_eq!(signed_in.status, StatusCode::OK);

    let bad_bearer = app
        .call(
            Method::POST,
            "/cards/new",
            Call {
                bearer: Some("junk"),
                ..Call::default()
            },
        )
        .await;
    assert_eq!(bad_bearer.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_preview_rejects_bad_options() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/cards/new",
            Call {
                body: Some(json!({ "include_symbols": "yes" })),
                ..Call::default()
            },
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "invalid_payload");
}
