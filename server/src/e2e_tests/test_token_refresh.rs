//! Refresh cookie issuance, rotation and removal.

use axum::http::{Method, StatusCode};
use axum_extra::extract::cookie::SameSite;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_login_sets_refresh_cookie() {
    let app = TestApp::new();
    let (_, login) = app.sign_up(EMAIL).await;

    let cookie = login.refresh_cookie().expect("refresh cookie");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.path(), Some("/"));
    assert!(cookie.expires_datetime().is_some());

    // The refresh token never appears in the body.
    assert!(!login.body.to_string().contains(cookie.value()));
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::new();
    let (token, login) = app.sign_up(EMAIL).await;
    let original = login.refresh_cookie().expect("refresh cookie");

    app.clock.advance(30);
    let first = app
        .call(
            Method::POST,
            "/auth/token/refresh",
            Call {
                refresh_cookie: Some(original.value()),
                ..Call::default()
            },
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    // The same cookie works again: rotation does not revoke.
    app.clock.advance(30);
    let second = app
        .call(
            Method::POST,
            "/auth/token/refresh",
            Call {
                refresh_cookie: Some(original.value()),
                ..Call::default()
            },
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);

    let first_token = first.body["access_token"].as_str().expect("token");
    let second_token = second.body["access_token"].as_str().expect("token");
    assert_ne!(first_token, token);
    assert_ne!(first_token, second_token);

    let first_cookie = first.refresh_cookie().expect("rotated cookie");
    let second_cookie = second.refresh_cookie().expect("rotated cookie");
    assert_ne!(first_cookie.value(), original.value());
    assert_ne!(first_cookie.value(), second_cookie.value());
    assert!(second_cookie.expires_datetime() > first_cookie.expires_datetime());

    let cards = app
        .call(
            Method::GET,
            "/cards",
            Call {
                bearer: Some(second_token),
                ..Call::default()
            },
        )
        .await;
    assert_eq!(cards.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = TestApp::new();
    let response = app
        .call(Method::POST, "/auth/token/refresh", Call::default())
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "refresh token is not set");
}

#[tokio::test]
async fn test_refresh_with_garbage_cookie() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/auth/token/refresh",
            Call {
                refresh_cookie: Some("not-a-jwt"),
                ..Call::default()
            },
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "failed to verify refresh token");
}

#[tokio::test]
async fn test_expired_refresh_cookie() {
    let app = TestApp::new();
    let (_, login) = app.sign_up(EMAIL).await;
    let cookie = login.refresh_cookie().expect("refresh cookie");

    app.clock.advance(4320 * 3600 + 1);
    let response = app
        .call(
            Method::POST,
            "/auth/token/refresh",
            Call {
                refresh_cookie: Some(cookie.value()),
                ..Call::default()
            },
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "refresh token has expired");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let (token, _) = app.sign_up(EMAIL).await;

    let response = app.call(Method::DELETE, "/auth/token", Call::default()).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let cookie = response.refresh_cookie().expect("removal cookie");
    assert_eq!(cookie.value(), "");
    let expires = cookie.expires_datetime().expect("expiry");
    assert_eq!(expires.unix_timestamp(), 0);

    // Access tokens outlive logout until they expire.
    let cards = app
        .call(
            Method::GET,
            "/cards",
            Call {
                bearer: Some(&token),
                ..Call::default()
            },
        )
        .await;
    assert_eq!(cards.status, StatusCode::OK);
}
