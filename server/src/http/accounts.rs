//! Account confirmation and password reset handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::AppState;
use super::schema::{JsonBody, NewPasswordRequest, ResetPasswordRequest};
use crate::auth::CurrentUser;
use crate::error::ServiceError;

pub async fn confirm(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.auth.confirm(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resend_confirmation(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, ServiceError> {
    state.auth.resend_confirmation(user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always 204, so the response does not reveal which addresses have accounts.
pub async fn reset_password_request(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> StatusCode {
    if let Err(e) = state.auth.reset_password_request(&request.email).await {
        tracing::info!(error = %e, "Password reset request not served");
    }
    StatusCode::NO_CONTENT
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(code): Path<String>,
    JsonBody(request): JsonBody<NewPasswordRequest>,
) -> Result<StatusCode, ServiceError> {
    state.auth.reset_password(&code, &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
