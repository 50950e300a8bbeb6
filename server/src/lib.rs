// Life of a request:
// 1. HTTP request comes in through the axum router
// 2. The auth gate verifies the bearer token (if any) and records the subject
// 3. The handler parses the body and calls a service
// 4. For cards:
//     - Claim the card for the caller (ownership check)
//     - Encrypt or decrypt with the card cipher on a blocking thread
//     - Read or write the store
//    For auth:
//     - Check credentials against the user store
//     - Mint tokens and set or clear the refresh cookie
//    For accounts and admin:
//     - Issue or consume single-use codes, mailing the links
//     - Check `is_admin` before touching other users
// 5. Errors are rendered as `{code, message, details?}`
//
// System components:
//  - Key loader (filesystem or object storage), run once at startup
//  - Card cipher (Argon2id + ChaCha20-Poly1305, RSA-OAEP key wrap)
//  - Token authority (RS256 JWTs, JWKS)
//  - Stores and mailer behind traits

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod keys;
pub mod mailer;
pub mod services;
pub mod store;
pub mod time;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, ServiceError};
