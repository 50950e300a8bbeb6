//! Access and refresh token lifecycle.
//!
//! Tokens are RS256 JWTs signed with the process key and carrying
//! `{ sub, exp, iat, jti }`. Access tokens travel as bearer tokens; refresh
//! tokens only ever travel in the `refresh_token` cookie.
//!
//! # Pre-conditions
//! - The key material is a valid RSA key pair.
//!
//! # Post-conditions
//! - Every issued token verifies against [`TokenAuthority::jwks`].
//! - A successful refresh always yields a fresh pair and a new cookie.
//!
//! # Invariants
//! - The published key set holds exactly one key with `kid = "default"`.
//! - Expiry is judged against the injected [`TimeSource`] with zero leeway.
//! - Refresh tokens are never revoked; rotation is by cookie overwrite only.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, Expiration, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::{
    AlgorithmParameters, CommonParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
    RSAKeyParameters, RSAKeyType,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::keys::KeyMaterial;
use crate::time::TimeSource;

/// Key id of the single published signing key.
pub const KEY_ID: &str = "default";
/// Name of the cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    /// Unique per token so two pairs minted in the same second still differ.
    pub jti: String,
}

/// Freshly minted tokens for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Unix timestamp at which the refresh token expires.
    pub refresh_expires_at: u64,
}

/// JSON body returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    /// Always `"HttpOnly"`: the refresh token itself is only in the cookie.
    pub refresh_token: String,
}

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

enum VerifyFailure {
    Invalid,
    Expired,
}

/// Issues and verifies tokens and publishes the verification key.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    jwks: JwkSet,
    settings: TokenSettings,
    clock: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Derive the signing key and the published JWKS from `keys`.
    pub fn new(
        keys: &KeyMaterial,
        settings: TokenSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ServiceError> {
        let der = keys
            .private_key()
            .to_pkcs1_der()
            .map_err(ServiceError::internal)?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        let public_key = keys.public_key();
        let jwk = Jwk {
            common: CommonParameters {
                public_key_use: Some(PublicKeyUse::Signature),
                key_algorithm: Some(KeyAlgorithm::RS256),
                key_id: Some(KEY_ID.to_string()),
                ..CommonParameters::default()
            },
            algorithm: AlgorithmParameters::RSA(RSAKeyParameters {
                key_type: RSAKeyType::RSA,
                n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            }),
        };
        let decoding_key = DecodingKey::from_jwk(&jwk).map_err(ServiceError::internal)?;

        Ok(Self {
            encoding_key,
            decoding_key,
            jwks: JwkSet { keys: vec![jwk] },
            settings,
            clock,
        })
    }

    /// The public key set. Identical on every call.
    #[must_use]
    pub const fn jwks(&self) -> &JwkSet {
        &self.jwks
    }

    #[must_use]
    pub const fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Mint an access token and a refresh token for `subject`.
    pub fn issue_token_pair(&self, subject: Uuid) -> Result<TokenPair, ServiceError> {
        let now = self.clock.now_secs();
        let access_exp = now.saturating_add(self.settings.access_ttl.as_secs());
        let refresh_exp = now.saturating_add(self.settings.refresh_ttl.as_secs());

        let access_token = self.sign(subject, now, access_exp)?;
        let refresh_token = self.sign(subject, now, refresh_exp)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.settings.access_ttl.as_secs(),
            refresh_expires_at: refresh_exp,
        })
    }

    /// Verify a bearer access token and return its subject.
    pub fn verify_bearer(&self, token: &str) -> Result<String, ServiceError> {
        let claims = self.verify(token).map_err(|failure| match failure {
            VerifyFailure::Invalid => ServiceError::unauthorized("failed to verify token"),
            VerifyFailure::Expired => ServiceError::token_expired(),
        })?;

        if claims.sub.is_empty() {
            return Err(ServiceError::forbidden("Invalid token"));
        }
        Ok(claims.sub)
    }

    /// Rotate a refresh token.
    ///
    /// `user_exists` is consulted after the token verifies; a subject with no
    /// matching user yields `NotFound`.
    pub async fn refresh<F, Fut>(
        &self,
        refresh_token: &str,
        user_exists: F,
    ) -> Result<TokenPair, ServiceError>
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = Result<bool, ServiceError>>,
    {
        if refresh_token.is_empty() {
            return Err(ServiceError::unauthorized("refresh token is not set"));
        }

        let claims = self.verify(refresh_token).map_err(|failure| match failure {
            VerifyFailure::Invalid => ServiceError::unauthorized("failed to verify refresh token"),
            VerifyFailure::Expired => ServiceError::unauthorized("refresh token has expired"),
        })?;

        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::unauthorized("invalid refresh token subject"))?;

        if !user_exists(subject).await? {
            return Err(ServiceError::not_found("User not found"));
        }

        tracing::debug!(subject = %subject, "Rotating refresh token");
        self.issue_token_pair(subject)
    }

    /// Body for login and refresh responses.
    #[must_use]
    pub fn token_response(&self, pair: &TokenPair) -> TokenResponse {
        TokenResponse {
            access_token: pair.access_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
            refresh_token: "HttpOnly".to_string(),
        }
    }

    /// The `Set-Cookie` value carrying the pair's refresh token.
    #[must_use]
    pub fn refresh_cookie(&self, pair: &TokenPair) -> Cookie<'static> {
        let expires = i64::try_from(pair.refresh_expires_at)
            .ok()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .map_or(Expiration::Session, Expiration::DateTime);

        Cookie::build((REFRESH_TOKEN_COOKIE, pair.refresh_token.clone()))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .expires(expires)
            .build()
    }

    /// A cookie that overwrites and immediately expires the refresh cookie.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((REFRESH_TOKEN_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(time::Duration::ZERO)
            .build()
    }

    fn sign(&self, subject: Uuid, iat: u64, exp: u64) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KEY_ID.to_string());

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(ServiceError::internal)
    }

    fn verify(&self, token: &str) -> Result<Claims, VerifyFailure> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| VerifyFailure::Invalid)?;
        let known_kid = header
            .kid
            .as_deref()
            .is_some_and(|kid| self.jwks.find(kid).is_some());
        if !known_kid {
            return Err(VerifyFailure::Invalid);
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| VerifyFailure::Invalid)?;

        if self.clock.now_secs() > data.claims.exp {
            return Err(VerifyFailure::Expired);
        }
        Ok(data.claims)
    }
}
