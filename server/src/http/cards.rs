//! `/cards` handlers.
//!
//! Every handler taking a card id claims the card for the current user before
//! doing anything else.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use super::AppState;
use super::schema::{JsonBody, NewCardRequest, NewCardResponse, UpdateCardRequest};
use crate::auth::CurrentUser;
use crate::crypto::CardOptions;
use crate::error::ServiceError;
use crate::services::{CardClaim, DecryptedCard};
use crate::store::Card;

/// Malformed ids are reported the same way as unknown ones.
fn parse_card_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::not_found("Card not found"))
}

async fn claim(state: &AppState, raw_id: &str, user: CurrentUser) -> Result<CardClaim, ServiceError> {
    let card_id = parse_card_id(raw_id)?;
    state.cards.claim(card_id, user.0).await
}

/// Generate a preview card. The body, if any, carries [`CardOptions`].
pub async fn preview(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    body: Bytes,
) -> Result<Json<NewCardResponse>, ServiceError> {
    let options: CardOptions = if body.is_empty() {
        CardOptions::default()
    } else {
        serde_json::from_slice(&body).map_err(ServiceError::invalid_payload)?
    };

    if let Some(user) = user {
        tracing::debug!(user_id = %user.0, "Generating preview card");
    }
    let generated = state.cards.generate_preview(&options)?;
    Ok(Json(NewCardResponse {
        data: generated.data,
        key: generated.passphrase,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Card>>, ServiceError> {
    Ok(Json(state.cards.list_cards(user.0).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(request): JsonBody<NewCardRequest>,
) -> Result<(StatusCode, Json<Card>), ServiceError> {
    let card = state
        .cards
        .create_card(user.0, &request.title, &request.data, &request.key)
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Card>, ServiceError> {
    let claim = claim(&state, &id, user).await?;
    Ok(Json(state.cards.get_card(&claim).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateCardRequest>,
) -> Result<StatusCode, ServiceError> {
    let claim = claim(&state, &id, user).await?;
    state.cards.update_card(&claim, &request.title).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let claim = claim(&state, &id, user).await?;
    state.cards.delete_card(&claim).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn decrypt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DecryptedCard>, ServiceError> {
    let claim = claim(&state, &id, user).await?;
    Ok(Json(state.cards.decrypt_card(&claim).await?))
}
