//! In-process store backed by hash maps.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{ActionCode, ActionCodeStore, ActionKind, Card, CardStore, User, UserStore};
use crate::error::ServiceError;

fn poisoned<T>(_: T) -> ServiceError {
    ServiceError::internal("store lock poisoned")
}

/// Users, cards and action codes held in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    cards: RwLock<HashMap<Uuid, Card>>,
    /// Keyed by the code string.
    codes: RwLock<HashMap<String, ActionCode>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, ServiceError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::conflict("User with this e-mail already exists"));
        }
        if users.contains_key(&user.id) {
            return Err(ServiceError::conflict("User already exists"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, ServiceError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .values()
            .any(|other| other.id != user.id && other.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::conflict("Email already exists"));
        }
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(ServiceError::not_found("User not found")),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<User, ServiceError> {
        let removed = self
            .users
            .write()
            .map_err(poisoned)?
            .remove(&id)
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        self.codes
            .write()
            .map_err(poisoned)?
            .retain(|_, code| code.user_id != id);
        Ok(removed)
    }
}

#[async_trait]
impl ActionCodeStore for MemoryStore {
    async fn create_code(&self, code: ActionCode) -> Result<ActionCode, ServiceError> {
        let mut codes = self.codes.write().map_err(poisoned)?;
        if codes.contains_key(&code.code) {
            return Err(ServiceError::conflict("Action code already exists"));
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(code)
    }

    async fn take_code(
        &self,
        kind: ActionKind,
        code: &str,
    ) -> Result<Option<ActionCode>, ServiceError> {
        let mut codes = self.codes.write().map_err(poisoned)?;
        if codes.get(code).is_some_and(|found| found.kind == kind) {
            Ok(codes.remove(code))
        } else {
            Ok(None)
        }
    }

    async fn revoke_codes(&self, user_id: Uuid, kind: ActionKind) -> Result<(), ServiceError> {
        self.codes
            .write()
            .map_err(poisoned)?
            .retain(|_, code| code.user_id != user_id || code.kind != kind);
        Ok(())
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Card>, ServiceError> {
        let cards = self.cards.read().map_err(poisoned)?;
        Ok(cards.get(&id).cloned())
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Card>, ServiceError> {
        let cards = self.cards.read().map_err(poisoned)?;
        let mut owned: Vec<Card> = cards
            .values()
            .filter(|card| card.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn create(&self, card: Card) -> Result<Card, ServiceError> {
        let mut cards = self.cards.write().map_err(poisoned)?;
        if cards.contains_key(&card.id) {
            return Err(ServiceError::conflict("Card already exists"));
        }
        cards.insert(card.id, card.clone());
        Ok(card)
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<Card, ServiceError> {
        let mut cards = self.cards.write().map_err(poisoned)?;
        let card = cards
            .get_mut(&id)
            .ok_or_else(|| ServiceError::not_found("Card not found"))?;
        title.clone_into(&mut card.title);
        card.updated_at = OffsetDateTime::now_utc();
        Ok(card.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut cards = self.cards.write().map_err(poisoned)?;
        cards
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Card not found"))
    }
}
