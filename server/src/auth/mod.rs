//! Authentication: token issuance and the request gate.
//!
//! # Pre-conditions
//! - A single [`KeyMaterial`](crate::keys::KeyMaterial) has been loaded.
//!
//! # Post-conditions
//! - Handlers behind the gate can extract a [`CurrentUser`].
//!
//! # Invariants
//! - Token state is never stored server-side.

pub mod gate;
pub mod tokens;

pub use gate::{AuthSubject, CurrentUser, optional_auth, require_auth};
pub use tokens::{
    Claims, KEY_ID, REFRESH_TOKEN_COOKIE, TokenAuthority, TokenPair, TokenResponse, TokenSettings,
};
