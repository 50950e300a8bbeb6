//! Service error taxonomy.
//!
//! Every fallible operation in the service layer returns a [`ServiceError`]:
//! a tagged error carrying an [`ErrorKind`], a human readable message and an
//! optional diagnostic detail. The kind decides the HTTP status and the stable
//! machine readable code sent to clients.
//!
//! # Invariants
//! - Authorization and ownership failures never carry a detail, so nothing
//!   about the underlying cause leaks to the caller.
//! - Cryptographic failures keep their detail server-side only; a decryption
//!   failure looks identical whether the key or the data was wrong.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Classification of a service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request body could not be parsed.
    InvalidPayload,
    /// The request was understood but its values are unacceptable.
    BadRequest,
    /// Missing, invalid or expired credentials.
    Unauthorized,
    /// The token signature is valid but the token is past its expiry.
    TokenExpired,
    /// Authentication is required but absent, or the token subject is invalid.
    Forbidden,
    /// The account exists but has been deactivated.
    InactiveUser,
    /// The referenced resource does not exist or is not owned by the caller.
    NotFound,
    /// A uniqueness constraint was violated.
    Conflict,
    /// The symmetric or RSA wrap step failed.
    EncryptionError,
    /// The unwrap or symmetric decrypt step failed.
    DecryptionError,
    /// Stored base64 input was malformed.
    DecodingError,
    /// Anything else that went wrong on our side.
    ServerError,
}

impl ErrorKind {
    /// Stable code sent in the `code` field of error responses.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::TokenExpired => "token_expired",
            Self::Forbidden => "forbidden",
            Self::InactiveUser => "inactive_user",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::EncryptionError => "encryption_error",
            Self::DecryptionError => "decryption_error",
            Self::DecodingError => "decoding_error",
            Self::ServerError => "internal_error",
        }
    }

    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidPayload | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::InactiveUser => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::EncryptionError
            | Self::DecryptionError
            | Self::DecodingError
            | Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by services, stores and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
    expose_detail: bool,
}

impl ServiceError {
    /// Create a message-only error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            expose_detail: false,
        }
    }

    /// Attach a diagnostic detail that stays in server logs.
    #[must_use]
    pub fn with_detail(mut self, detail: impl std::fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Whether `detail` is included in the response body.
    #[must_use]
    pub const fn exposes_detail(&self) -> bool {
        self.expose_detail
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn invalid_payload(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidPayload, err.to_string())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorKind::TokenExpired, "token has expired")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn inactive_user() -> Self {
        Self::new(ErrorKind::InactiveUser, "User is not active")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Generic server error whose detail is shown to operators in the body.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        let mut error = Self::new(ErrorKind::ServerError, "internal server error").with_detail(err);
        error.expose_detail = true;
        error
    }

    pub fn encryption(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::EncryptionError, "unable to encrypt card").with_detail(err)
    }

    pub fn decryption(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::DecryptionError, "unable to decrypt card").with_detail(err)
    }

    pub fn decoding(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::DecodingError, "unable to decode card").with_detail(err)
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'static str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a str>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        if status.is_server_error() {
            tracing::error!(
                code = self.kind.code(),
                detail = self.detail.as_deref().unwrap_or_default(),
                "{}",
                self.message
            );
        }

        let details = if self.expose_detail {
            self.detail.as_deref()
        } else {
            None
        };
        let body = ErrorBody {
            code: self.kind.code(),
            message: &self.message,
            details,
        };
        (status, Json(body)).into_response()
    }
}
