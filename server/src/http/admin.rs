//! `/admin/users` handlers.
//!
//! Every handler takes an [`AdminUser`], so the route group's bearer check is
//! followed by an `is_admin` check before any work is done.

use axum::Json;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use uuid::Uuid;

use super::AppState;
use super::schema::{
    JsonBody, RegisterRequest, UpdateEmailRequest, UpdatePasswordRequest, UpdateUserRequest,
};
use crate::auth::CurrentUser;
use crate::error::ServiceError;
use crate::services::UserProfile;
use crate::store::User;

/// The authenticated caller, known to be an active admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(caller) =
            <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;
        state.users.require_admin(caller).await.map(Self)
    }
}

/// Malformed ids are reported the same way as unknown ones.
fn parse_user_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::not_found("User not found"))
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ServiceError> {
    tracing::debug!(admin_id = %admin.id, "Admin creating user");
    let profile = state
        .users
        .create(&request.full_name, &request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ServiceError> {
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.users.get(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ServiceError> {
    let id = parse_user_id(&user_id)?;
    let profile = state.users.update(id, &request.full_name).await?;
    Ok((StatusCode::ACCEPTED, Json(profile)))
}

pub async fn update_email(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<UpdateEmailRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ServiceError> {
    let id = parse_user_id(&user_id)?;
    let profile = state
        .users
        .update_email(id, &request.email, &request.password)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(profile)))
}

pub async fn update_password(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<UpdatePasswordRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ServiceError> {
    let id = parse_user_id(&user_id)?;
    let profile = state
        .users
        .update_password(id, &request.old_password, &request.new_password)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(profile)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ServiceError> {
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.users.delete(id).await?))
}
