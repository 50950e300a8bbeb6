//! HTTP surface.
//!
//! # Route groups
//! - Public: health, JWKS, login, refresh, logout, registration, account
//!   confirmation and password reset.
//! - Optional bearer: `POST /cards/new`.
//! - Required bearer: everything else under `/cards`, and
//!   `POST /accounts/resend-confirmation`.
//! - Required bearer of an admin: `/admin/users`.

mod accounts;
mod admin;
mod auth;
mod cards;
mod schema;
mod system;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::auth::{TokenAuthority, TokenSettings, optional_auth, require_auth};
use crate::config::ServerConfig;
use crate::crypto::{CardCipher, ClassicCardGenerator};
use crate::error::ServiceError;
use crate::keys::KeyMaterial;
use crate::mailer::Mailer;
use crate::services::{AccountSettings, AuthService, CardService, UserService};
use crate::store::MemoryStore;
use crate::time::TimeSource;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenAuthority>,
    pub auth: Arc<AuthService>,
    pub cards: Arc<CardService>,
    pub users: Arc<UserService>,
}

impl AppState {
    /// Wire the services over a fresh in-memory store.
    pub fn build(
        keys: Arc<KeyMaterial>,
        config: &ServerConfig,
        clock: Arc<dyn TimeSource>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, ServiceError> {
        let settings = TokenSettings {
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        };
        let tokens = Arc::new(TokenAuthority::new(&keys, settings, Arc::clone(&clock))?);
        let store = Arc::new(MemoryStore::new());

        let auth = AuthService::new(
            store.clone(),
            store.clone(),
            Arc::clone(&tokens),
            mailer,
            clock,
            AccountSettings {
                app_host: config.app_host.clone(),
                admin_emails: config.admin_emails.clone(),
            },
        );
        let users = UserService::new(store.clone(), store.clone());
        let cards = CardService::new(
            CardCipher::new(keys, config.kdf.clone()),
            store,
            Arc::new(ClassicCardGenerator),
        );

        Ok(Self {
            tokens,
            auth: Arc::new(auth),
            cards: Arc::new(cards),
            users: Arc::new(users),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let tokens = Arc::clone(&state.tokens);

    let private = Router::new()
        .route("/cards", get(cards::list).post(cards::create))
        .route(
            "/cards/{id}",
            get(cards::get).put(cards::update).delete(cards::delete),
        )
        .route("/cards/{id}/decrypt", get(cards::decrypt))
        .route(
            "/accounts/resend-confirmation",
            post(accounts::resend_confirmation),
        )
        .route_layer(from_fn_with_state(Arc::clone(&tokens), require_auth));

    let admin_only = Router::new()
        .route("/admin/users", post(admin::create_user))
        .route(
            "/admin/users/{user_id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/admin/users/{user_id}/email", put(admin::update_email))
        .route("/admin/users/{user_id}/password", put(admin::update_password))
        .route_layer(from_fn_with_state(Arc::clone(&tokens), require_auth));

    let optional = Router::new()
        .route("/cards/new", post(cards::preview))
        .route_layer(from_fn_with_state(tokens, optional_auth));

    Router::new()
        .route("/system/health", get(system::health))
        .route("/auth/jwks", get(auth::jwks))
        .route("/auth/token", post(auth::login).delete(auth::logout))
        .route("/auth/token/refresh", post(auth::refresh))
        .route("/accounts/register", post(auth::register))
        .route("/accounts/confirm/{code}", get(accounts::confirm))
        .route("/accounts/reset-password", post(accounts::reset_password_request))
        .route("/accounts/reset-password/{code}", post(accounts::reset_password))
        .merge(private)
        .merge(admin_only)
        .merge(optional)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
