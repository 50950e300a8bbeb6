//! Card orchestration: generate, encrypt and store, claim, decrypt.
//!
//! # Invariants
//! - Every operation on an existing card goes through a [`CardClaim`], which
//!   can only be obtained after the store confirms the caller owns the card.
//! - A card that exists but belongs to someone else is indistinguishable from
//!   a card that does not exist.
//! - Ciphertext fields are written once, at creation.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::crypto::{CardCipher, CardGenerator, CardOptions, GeneratedCard};
use crate::error::ServiceError;
use crate::store::{Card, CardStore};

/// Proof that `owner_id` owns `card_id`. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardClaim {
    card_id: Uuid,
    owner_id: Uuid,
}

impl CardClaim {
    #[must_use]
    pub const fn card_id(&self) -> Uuid {
        self.card_id
    }

    #[must_use]
    pub const fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// A card opened for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptedCard {
    pub title: String,
    pub data: String,
    pub key: String,
}

pub struct CardService {
    cipher: CardCipher,
    cards: Arc<dyn CardStore>,
    generator: Arc<dyn CardGenerator>,
}

fn card_not_found() -> ServiceError {
    ServiceError::not_found("Card not found")
}

impl CardService {
    #[must_use]
    pub fn new(
        cipher: CardCipher,
        cards: Arc<dyn CardStore>,
        generator: Arc<dyn CardGenerator>,
    ) -> Self {
        Self {
            cipher,
            cards,
            generator,
        }
    }

    /// A fresh card and passphrase for the user to review. Nothing is stored.
    pub fn generate_preview(&self, options: &CardOptions) -> Result<GeneratedCard, ServiceError> {
        self.generator.generate(options)
    }

    /// Encrypt `data` under `passphrase` and store it for `owner_id`.
    pub async fn create_card(
        &self,
        owner_id: Uuid,
        title: &str,
        data: &str,
        passphrase: &str,
    ) -> Result<Card, ServiceError> {
        if title.trim().is_empty() {
            return Err(ServiceError::bad_request("Title is required"));
        }
        if data.is_empty() {
            return Err(ServiceError::bad_request("Card data is required"));
        }
        if passphrase.is_empty() {
            return Err(ServiceError::bad_request("Key is required"));
        }

        let cipher = self.cipher.clone();
        let (data, passphrase) = (data.to_string(), passphrase.to_string());
        let payload = tokio::task::spawn_blocking(move || cipher.encrypt(&data, &passphrase))
            .await
            .map_err(ServiceError::internal)??;

        let now = OffsetDateTime::now_utc();
        let card = Card {
            id: Uuid::new_v4(),
            owner_id,
            title: title.trim().to_string(),
            encrypted_data: payload.ciphertext,
            encrypted_key: payload.wrapped_key,
            created_at: now,
            updated_at: now,
        };

        let card = self.cards.create(card).await?;
        tracing::info!(card_id = %card.id, owner_id = %owner_id, "Card created");
        Ok(card)
    }

    /// Confirm that `owner_id` owns `card_id`.
    pub async fn claim(&self, card_id: Uuid, owner_id: Uuid) -> Result<CardClaim, ServiceError> {
        match self.cards.get(card_id).await? {
            Some(card) if card.owner_id == owner_id => Ok(CardClaim { card_id, owner_id }),
            _ => Err(card_not_found()),
        }
    }

    pub async fn claim_exists(&self, card_id: Uuid, owner_id: Uuid) -> Result<bool, ServiceError> {
        match self.claim(card_id, owner_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == crate::error::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get_card(&self, claim: &CardClaim) -> Result<Card, ServiceError> {
        self.cards
            .get(claim.card_id)
            .await?
            .ok_or_else(card_not_found)
    }

    pub async fn list_cards(&self, owner_id: Uuid) -> Result<Vec<Card>, ServiceError> {
        self.cards.list_for_owner(owner_id).await
    }

    /// Rename a card. The ciphertext is left untouched.
    pub async fn update_card(&self, claim: &CardClaim, title: &str) -> Result<Card, ServiceError> {
        if title.trim().is_empty() {
            return Err(ServiceError::bad_request("Title is required"));
        }
        self.cards.update_title(claim.card_id, title.trim()).await
    }

    pub async fn delete_card(&self, claim: &CardClaim) -> Result<(), ServiceError> {
        self.cards.delete(claim.card_id).await?;
        tracing::info!(card_id = %claim.card_id, "Card deleted");
        Ok(())
    }

    /// Recover the plaintext and passphrase of a claimed card.
    pub async fn decrypt_card(&self, claim: &CardClaim) -> Result<DecryptedCard, ServiceError> {
        let card = self.get_card(claim).await?;

        let cipher = self.cipher.clone();
        let Card {
            title,
            encrypted_data,
            encrypted_key,
            ..
        } = card;
        let payload =
            tokio::task::spawn_blocking(move || cipher.decrypt(&encrypted_data, &encrypted_key))
                .await
                .map_err(ServiceError::internal)??;

        Ok(DecryptedCard {
            title,
            data: payload.plaintext,
            key: payload.passphrase,
        })
    }
}
