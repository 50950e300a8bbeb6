//! Bearer token middleware.
//!
//! Route groups are wrapped in either [`require_auth`] or [`optional_auth`].
//! Both verify a present `Authorization: Bearer <token>` header and record the
//! subject as an [`AuthSubject`] request extension; they differ only in what
//! happens when the header is absent.
//!
//! # Invariants
//! - The gate never reads or writes the refresh cookie.
//! - A present but invalid bearer token is rejected on both route groups.
//! - An `Authorization` header that is not visible ASCII is rejected, never
//!   treated as absent.

use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::tokens::TokenAuthority;
use crate::error::ServiceError;

const BEARER_PREFIX: &str = "Bearer ";

/// Verified token subject, stored in request extensions by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSubject(pub String);

/// Routes behind this layer reject requests without a bearer token.
pub async fn require_auth(
    State(tokens): State<Arc<TokenAuthority>>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    gate(&tokens, request, next, true).await
}

/// Routes behind this layer accept anonymous requests.
pub async fn optional_auth(
    State(tokens): State<Arc<TokenAuthority>>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    gate(&tokens, request, next, false).await
}

async fn gate(
    tokens: &TokenAuthority,
    mut request: Request,
    next: Next,
    required: bool,
) -> Result<Response, ServiceError> {
    let bearer = match request.headers().get(AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| {
                tracing::debug!("Rejected non-ASCII authorization header");
                ServiceError::unauthorized("failed to verify token")
            })?;
            value.strip_prefix(BEARER_PREFIX).map(str::to_string)
        }
        None => None,
    };

    match bearer {
        Some(token) => {
            let subject = tokens.verify_bearer(&token).inspect_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
            })?;
            request.extensions_mut().insert(AuthSubject(subject));
        }
        None if required => return Err(ServiceError::forbidden("Please authenticate")),
        None => {}
    }

    Ok(next.run(request).await)
}

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

fn parse_subject(subject: &AuthSubject) -> Result<CurrentUser, ServiceError> {
    Uuid::parse_str(&subject.0)
        .map(CurrentUser)
        .map_err(|_| ServiceError::forbidden("Invalid token"))
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .extensions
            .get::<AuthSubject>()
            .ok_or_else(|| ServiceError::forbidden("Please authenticate"))?;
        parse_subject(subject)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSubject>()
            .map(parse_subject)
            .transpose()
    }
}
