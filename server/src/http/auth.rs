//! `/auth` and `/accounts` handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use jsonwebtoken::jwk::JwkSet;

use super::AppState;
use super::schema::{JsonBody, LoginRequest, RegisterRequest};
use crate::auth::{REFRESH_TOKEN_COOKIE, TokenResponse};
use crate::error::ServiceError;
use crate::services::UserProfile;

pub async fn jwks(State(state): State<AppState>) -> Json<JwkSet> {
    Json(state.tokens.jwks().clone())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ServiceError> {
    let pair = state.auth.login(&request.email, &request.password).await?;
    let jar = jar.add(state.tokens.refresh_cookie(&pair));
    Ok((jar, Json(state.tokens.token_response(&pair))))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), ServiceError> {
    let current = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default();

    let pair = state.auth.refresh(&current).await?;
    let jar = jar.add(state.tokens.refresh_cookie(&pair));
    Ok((jar, Json(state.tokens.token_response(&pair))))
}

/// Clears the refresh cookie. Issued access tokens stay valid until they expire.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, jar.add(state.tokens.removal_cookie()))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ServiceError> {
    let profile = state
        .auth
        .register(&request.full_name, &request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}
