use axum::http::{Method, StatusCode};

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_jwks_endpoint() {
    let app = TestApp::new();

    let first = app.call(Method::GET, "/auth/jwks", Call::default()).await;
    assert_eq!(first.status, StatusCode::OK);

    let keys = first.body["keys"].as_array().expect("keys");
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kid"], "default");
    assert_eq!(keys[0]["alg"], "RS256");
    assert_eq!(keys[0]["use"], "sig");
    assert!(keys[0].get("d").is_none(), "private exponent must not be published");

    let second = app.call(Method::GET, "/auth/jwks", Call::default()).await;
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.call(Method::GET, "/system/health", Call::default()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ok"], true);
}
