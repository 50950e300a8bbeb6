//! Account orchestration: registration, login, refresh and the mailed
//! action codes (account confirmation and password reset).
//!
//! Logout has no server-side state to touch; the handler only clears the
//! refresh cookie.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{TokenAuthority, TokenPair};
use crate::crypto::password::{hash_password, is_strong_password, verify_password};
use crate::error::ServiceError;
use crate::mailer::{MailMessage, Mailer};
use crate::store::{ActionCode, ActionCodeStore, ActionKind, User, UserStore};
use crate::time::TimeSource;

const BAD_CREDENTIALS: &str = "E-mail or password wrong";

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_confirmed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            is_active: user.is_active,
            is_admin: user.is_admin,
            is_confirmed: user.is_confirmed,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Settings for registration and mailed links.
#[derive(Debug, Clone, Default)]
pub struct AccountSettings {
    /// Host placed in confirmation and reset links.
    pub app_host: String,
    /// Addresses that become admins on registration.
    pub admin_emails: Vec<String>,
}

pub(crate) fn check_email(email: &str) -> Result<(), ServiceError> {
    if email.len() <= 3 || !email.contains('@') {
        return Err(ServiceError::bad_request("Please provide e-mail"));
    }
    Ok(())
}

/// Strength check, then Argon2 on a blocking thread.
pub(crate) async fn hash_new_password(password: &str) -> Result<String, ServiceError> {
    if !is_strong_password(password) {
        return Err(ServiceError::bad_request("Insecure password"));
    }
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ServiceError::internal)?
}

pub(crate) async fn password_matches(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(ServiceError::internal)?
}

/// A fresh, active, unconfirmed account.
pub(crate) async fn new_user(
    full_name: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<User, ServiceError> {
    let email = email.trim();
    check_email(email)?;
    let password_hash = hash_new_password(password).await?;

    let now = OffsetDateTime::now_utc();
    Ok(User {
        id: Uuid::new_v4(),
        full_name: full_name.trim().to_string(),
        email: email.to_string(),
        password_hash,
        is_active: true,
        is_admin,
        is_confirmed: false,
        created_at: now,
        updated_at: now,
    })
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    codes: Arc<dyn ActionCodeStore>,
    tokens: Arc<TokenAuthority>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn TimeSource>,
    settings: AccountSettings,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        codes: Arc<dyn ActionCodeStore>,
        tokens: Arc<TokenAuthority>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn TimeSource>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            users,
            codes,
            tokens,
            mailer,
            clock,
            settings,
        }
    }

    /// Create an account and mail a confirmation link. Mail failure is logged
    /// and does not undo the registration.
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ServiceError> {
        let is_admin = self
            .settings
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email.trim()));
        let user = self
            .users
            .create(new_user(full_name, email, password, is_admin).await?)
            .await?;
        tracing::info!(user_id = %user.id, is_admin, "User registered");

        if let Err(e) = self.send_confirmation(&user).await {
            tracing::warn!(user_id = %user.id, error = %e, "Unable to send confirmation mail");
        }

        Ok(user.into())
    }

    /// Check credentials and mint a token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ServiceError> {
        if email.len() <= 3 {
            return Err(ServiceError::bad_request("Please provide e-mail"));
        }
        if password.len() <= 3 {
            return Err(ServiceError::bad_request("Please provide password"));
        }

        let Some(user) = self.users.get_by_email(email.trim()).await? else {
            tracing::info!("Login for unknown e-mail");
            return Err(ServiceError::forbidden(BAD_CREDENTIALS));
        };

        if !password_matches(password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "Login with wrong password");
            return Err(ServiceError::forbidden(BAD_CREDENTIALS));
        }

        if !user.is_active {
            return Err(ServiceError::inactive_user());
        }

        self.tokens.issue_token_pair(user.id)
    }

    /// Rotate the refresh cookie for a user that still exists.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let users = Arc::clone(&self.users);
        self.tokens
            .refresh(refresh_token, |id| async move { users.exists(id).await })
            .await
    }

    /// Redeem a confirmation code.
    pub async fn confirm(&self, code: &str) -> Result<(), ServiceError> {
        let Some(action) = self.codes.take_code(ActionKind::Confirmation, code).await? else {
            return Err(ServiceError::not_found("Confirmation code not found"));
        };
        if action.is_expired(self.clock.now_secs()) {
            return Err(ServiceError::conflict("Confirmation code has already expired"));
        }

        let mut user = self
            .users
            .get(action.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        user.is_confirmed = true;
        user.updated_at = OffsetDateTime::now_utc();
        self.users.update(user).await?;
        tracing::info!(user_id = %action.user_id, "User confirmed");
        Ok(())
    }

    /// Replace any outstanding confirmation code and mail the new one.
    pub async fn resend_confirmation(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        if user.is_confirmed {
            return Err(ServiceError::conflict("User has already confirmed account"));
        }
        self.send_confirmation(&user).await
    }

    /// Mail a password reset link to the owner of `email`.
    pub async fn reset_password_request(&self, email: &str) -> Result<(), ServiceError> {
        let user = self
            .users
            .get_by_email(email.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let action = self.issue_code(user.id, ActionKind::PasswordReset).await?;
        let message = MailMessage::password_reset(&self.settings.app_host, &action.code);
        self.mailer
            .send(&message, &user.email)
            .await
            .map_err(ServiceError::internal)?;
        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Set a new password with a reset code instead of the old password.
    pub async fn reset_password(&self, code: &str, new_password: &str) -> Result<(), ServiceError> {
        let password_hash = hash_new_password(new_password).await?;

        let action = self
            .codes
            .take_code(ActionKind::PasswordReset, code)
            .await?
            .filter(|action| !action.is_expired(self.clock.now_secs()))
            .ok_or_else(|| ServiceError::bad_request("Invalid password reset code"))?;

        let mut user = self
            .users
            .get(action.user_id)
            .await?
            .ok_or_else(|| ServiceError::bad_request("Invalid password reset code"))?;
        user.password_hash = password_hash;
        user.updated_at = OffsetDateTime::now_utc();
        self.users.update(user).await?;
        self.codes
            .revoke_codes(action.user_id, ActionKind::PasswordReset)
            .await?;
        tracing::info!(user_id = %action.user_id, "Password reset");
        Ok(())
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    async fn send_confirmation(&self, user: &User) -> Result<(), ServiceError> {
        let action = self.issue_code(user.id, ActionKind::Confirmation).await?;
        let message = MailMessage::confirmation(&self.settings.app_host, &action.code);
        self.mailer
            .send(&message, &user.email)
            .await
            .map_err(ServiceError::internal)
    }

    /// Each user holds at most one live code per kind.
    async fn issue_code(&self, user_id: Uuid, kind: ActionKind) -> Result<ActionCode, ServiceError> {
        self.codes.revoke_codes(user_id, kind).await?;
        self.codes
            .create_code(ActionCode {
                id: Uuid::new_v4(),
                user_id,
                kind,
                code: Uuid::new_v4().simple().to_string(),
                created_at: self.clock.now_secs(),
            })
            .await
    }
}
