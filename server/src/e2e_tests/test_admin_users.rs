//! Admin user management behind the `is_admin` check.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::testing::TEST_ADMIN_EMAIL;

fn as_admin<'a>(token: &'a str, body: serde_json::Value) -> Call<'a> {
    Call {
        body: Some(body),
        bearer: Some(token),
        ..Call::default()
    }
}

#[tokio::test]
async fn test_non_admin_is_rejected() {
    let app = TestApp::new();
    let (token, _) = app.sign_up(EMAIL).await;

    let anonymous = app
        .call(Method::GET, "/admin/users/x", Call::default())
        .await;
    assert_eq!(anonymous.status, StatusCode::FORBIDDEN);
    assert_eq!(anonymous.body["message"], "Please authenticate");

    let plain = app
        .call(Method::GET, "/admin/users/x", Call::bearer(&token))
        .await;
    assert_eq!(plain.status, StatusCode::FORBIDDEN);
    assert_eq!(plain.body["message"], "Admin access required");

    let create = app
        .call(
            Method::POST,
            "/admin/users",
            as_admin(&token, json!({ "email": "c@d.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_manages_users() {
    let app = TestApp::new();
    let (admin, _) = app.sign_up(TEST_ADMIN_EMAIL).await;

    let created = app
        .call(
            Method::POST,
            "/admin/users",
            as_admin(
                &admin,
                json!({ "full_name": "Ada", "email": EMAIL, "password": PASSWORD }),
            ),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["is_admin"], false);
    let id = created.body["id"].as_str().expect("id").to_string();
    let path = format!("/admin/users/{id}");

    let fetched = app.call(Method::GET, &path, Call::bearer(&admin)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["email"], EMAIL);
    assert!(fetched.body.get("password_hash").is_none());

    let renamed = app
        .call(Method::PUT, &path, as_admin(&admin, json!({ "full_name": "Ada L" })))
        .await;
    assert_eq!(renamed.status, StatusCode::ACCEPTED);
    assert_eq!(renamed.body["full_name"], "Ada L");

    let bad_email_password = app
        .call(
            Method::PUT,
            &format!("{path}/email"),
            as_admin(&admin, json!({ "email": "new@b.com", "password": "Wr0ng!Passw0rd" })),
        )
        .await;
    assert_eq!(bad_email_password.status, StatusCode::FORBIDDEN);
    assert_eq!(bad_email_password.body["message"], "Invalid password");

    let taken = app
        .call(
            Method::PUT,
            &format!("{path}/email"),
            as_admin(&admin, json!({ "email": TEST_ADMIN_EMAIL, "password": PASSWORD })),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let moved = app
        .call(
            Method::PUT,
            &format!("{path}/email"),
            as_admin(&admin, json!({ "email": "new@b.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(moved.status, StatusCode::ACCEPTED);
    assert_eq!(moved.body["email"], "new@b.com");

    let new_password = "N3w!Passw0rd-2024";
    let changed = app
        .call(
            Method::PUT,
            &format!("{path}/password"),
            as_admin(
                &admin,
                json!({ "old_password": PASSWORD, "new_password": new_password }),
            ),
        )
        .await;
    assert_eq!(changed.status, StatusCode::ACCEPTED);
    assert_eq!(app.login("new@b.com", new_password).await.status, StatusCode::OK);

    let deleted = app.call(Method::DELETE, &path, Call::bearer(&admin)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["id"], id.as_str());

    let gone = app.call(Method::GET, &path, Call::bearer(&admin)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.login("new@b.com", new_password).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_malformed_user_id() {
    let app = TestApp::new();
    let (admin, _) = app.sign_up(TEST_ADMIN_EMAIL).await;

    let response = app
        .call(Method::GET, "/admin/users/not-a-uuid", Call::bearer(&admin))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "User not found");
}
