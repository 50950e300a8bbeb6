//! Persistence seams for users and cards.
//!
//! Services depend on the [`UserStore`], [`CardStore`] and [`ActionCodeStore`]
//! traits only. The bundled [`MemoryStore`] keeps everything in process and is
//! what the binary and the tests run against.

mod memory;

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ServiceError;

pub use memory::MemoryStore;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_confirmed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// What an [`ActionCode`] unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Marks the account as confirmed.
    Confirmation,
    /// Allows setting a new password without the old one.
    PasswordReset,
}

impl ActionKind {
    /// Seconds a code stays usable after it was issued.
    #[must_use]
    pub const fn ttl_secs(self) -> u64 {
        match self {
            Self::Confirmation => 60 * 60,
            Self::PasswordReset => 15 * 60,
        }
    }
}

/// A single-use code mailed to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ActionKind,
    pub code: String,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

impl ActionCode {
    /// Usable through `created_at + ttl`, expired afterwards.
    #[must_use]
    pub const fn is_expired(&self, now_secs: u64) -> bool {
        now_secs > self.created_at.saturating_add(self.kind.ttl_secs())
    }
}

/// A stored card. Only ciphertext is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub encrypted_data: String,
    pub encrypted_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<User>, ServiceError>;

    /// Case-insensitive lookup.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    async fn exists(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: User) -> Result<User, ServiceError>;

    /// Replace an existing user. Fails with `NotFound` if absent and with
    /// `Conflict` if the new email belongs to someone else.
    async fn update(&self, user: User) -> Result<User, ServiceError>;

    /// Remove a user and return the removed record.
    async fn delete(&self, id: Uuid) -> Result<User, ServiceError>;
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Card>, ServiceError>;

    /// Cards owned by `owner_id`, oldest first.
    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Card>, ServiceError>;

    /// Persist a card with both ciphertext fields in one write.
    async fn create(&self, card: Card) -> Result<Card, ServiceError>;

    async fn update_title(&self, id: Uuid, title: &str) -> Result<Card, ServiceError>;

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait ActionCodeStore: Send + Sync {
    async fn create_code(&self, code: ActionCode) -> Result<ActionCode, ServiceError>;

    /// Remove and return a code of the given kind. A code can be taken once.
    async fn take_code(
        &self,
        kind: ActionKind,
        code: &str,
    ) -> Result<Option<ActionCode>, ServiceError>;

    /// Drop every outstanding code of `kind` issued to `user_id`.
    async fn revoke_codes(&self, user_id: Uuid, kind: ActionKind) -> Result<(), ServiceError>;
}
