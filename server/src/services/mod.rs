//! Orchestration over the cipher, the token authority and the stores.

pub mod auth;
pub mod cards;
pub mod users;

pub use auth::{AccountSettings, AuthService, UserProfile};
pub use cards::{CardClaim, CardService, DecryptedCard};
pub use users::UserService;
