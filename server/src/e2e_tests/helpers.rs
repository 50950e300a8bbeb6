//! Common helpers for end-to-end tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum_extra::extract::cookie::Cookie;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::auth::REFRESH_TOKEN_COOKIE;
use crate::http::router;
use crate::testing::{RecordingMailer, TEST_NOW, test_app_state};
use crate::time::ManualTimeSource;

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "Str0ng!Passw0rd";

/// A router over a fresh in-memory store, with a clock the test controls.
pub struct TestApp {
    router: Router,
    pub clock: Arc<ManualTimeSource>,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `refresh_token` cookie set by this response, if any.
    pub fn refresh_cookie(&self) -> Option<Cookie<'static>> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value.to_string()).ok())
            .find(|cookie| cookie.name() == REFRESH_TOKEN_COOKIE)
    }
}

/// Request options beyond method and path.
#[derive(Default)]
pub struct Call<'a> {
    pub body: Option<Value>,
    pub bearer: Option<&'a str>,
    pub refresh_cookie: Option<&'a str>,
}

impl<'a> Call<'a> {
    pub fn bearer(token: &'a str) -> Self {
        Self {
            bearer: Some(token),
            ..Self::default()
        }
    }

    pub fn json(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        let clock = Arc::new(ManualTimeSource::new(TEST_NOW));
        let mailer = Arc::new(RecordingMailer::default());
        let router = router(test_app_state(clock.clone(), mailer.clone()));
        Self {
            router,
            clock,
            mailer,
        }
    }

    pub async fn call(&self, method: Method, path: &str, options: Call<'_>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = options.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(value) = options.refresh_cookie {
            builder = builder.header(COOKIE, format!("{REFRESH_TOKEN_COOKIE}={value}"));
        }
        let body = match options.body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        #[allow(clippy::expect_used)]
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request builds"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        #[allow(clippy::expect_used)]
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body collects");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/accounts/register",
            Call {
                body: Some(json!({ "full_name": "Test User", "email": email, "password": password })),
                ..Call::default()
            },
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/auth/token",
            Call {
                body: Some(json!({ "email": email, "password": password })),
                ..Call::default()
            },
        )
        .await
    }

    /// Register and log in; returns the access token and the login response.
    pub async fn sign_up(&self, email: &str) -> (String, TestResponse) {
        let registered = self.register(email, PASSWORD).await;
        assert_eq!(registered.status, StatusCode::CREATED);

        let login = self.login(email, PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK);
        #[allow(clippy::expect_used)]
        let token = login.body["access_token"]
            .as_str()
            .expect("access token in body")
            .to_string();
        (token, login)
    }

    pub async fn create_card(&self, token: &str, title: &str, data: &str, key: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/cards",
            Call {
                body: Some(json!({ "title": title, "data": data, "key": key })),
                bearer: Some(token),
                ..Call::default()
            },
        )
        .await
    }
}
