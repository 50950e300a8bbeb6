//! Admin user management.
//!
//! Every operation here is reachable only through [`UserService::require_admin`]
//! at the HTTP layer; the service itself does not re-check the caller.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use super::auth::{UserProfile, check_email, hash_new_password, new_user, password_matches};
use crate::error::ServiceError;
use crate::store::{ActionCodeStore, ActionKind, User, UserStore};

fn user_not_found() -> ServiceError {
    ServiceError::not_found("User not found")
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    codes: Arc<dyn ActionCodeStore>,
}

impl UserService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, codes: Arc<dyn ActionCodeStore>) -> Self {
        Self { users, codes }
    }

    /// Load the caller and make sure it is an active admin.
    pub async fn require_admin(&self, caller: Uuid) -> Result<User, ServiceError> {
        let user = self
            .users
            .get(caller)
            .await?
            .filter(|user| user.is_admin)
            .ok_or_else(|| ServiceError::forbidden("Admin access required"))?;
        if !user.is_active {
            return Err(ServiceError::inactive_user());
        }
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        Ok(self.load(id).await?.into())
    }

    /// Create an account without sending a confirmation mail.
    pub async fn create(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ServiceError> {
        let user = self
            .users
            .create(new_user(full_name, email, password, false).await?)
            .await?;
        tracing::info!(user_id = %user.id, "User created by admin");
        Ok(user.into())
    }

    pub async fn update(&self, id: Uuid, full_name: &str) -> Result<UserProfile, ServiceError> {
        let mut user = self.load(id).await?;
        full_name.trim().clone_into(&mut user.full_name);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(self.users.update(user).await?.into())
    }

    /// Change the address after checking the account's current password.
    pub async fn update_email(
        &self,
        id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ServiceError> {
        let email = email.trim();
        check_email(email)?;
        let mut user = self.load(id).await?;
        if !password_matches(password, &user.password_hash).await? {
            return Err(ServiceError::forbidden("Invalid password"));
        }

        email.clone_into(&mut user.email);
        user.updated_at = OffsetDateTime::now_utc();
        let user = self.users.update(user).await?;
        tracing::info!(user_id = %user.id, "User e-mail updated");
        Ok(user.into())
    }

    pub async fn update_password(
        &self,
        id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<UserProfile, ServiceError> {
        let mut user = self.load(id).await?;
        let password_hash = hash_new_password(new_password).await?;
        if !password_matches(old_password, &user.password_hash).await? {
            return Err(ServiceError::forbidden("Invalid password"));
        }

        user.password_hash = password_hash;
        user.updated_at = OffsetDateTime::now_utc();
        let user = self.users.update(user).await?;
        self.codes
            .revoke_codes(user.id, ActionKind::PasswordReset)
            .await?;
        tracing::info!(user_id = %user.id, "User password updated");
        Ok(user.into())
    }

    /// Remove the account and any codes issued to it.
    pub async fn delete(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        let user = self.users.delete(id).await?;
        tracing::info!(user_id = %user.id, "User deleted");
        Ok(user.into())
    }

    async fn load(&self, id: Uuid) -> Result<User, ServiceError> {
        self.users.get(id).await?.ok_or_else(user_not_found)
    }
}
