//! Cryptographic building blocks: the card cipher, preview generation and
//! password hashing.

pub mod cipher;
pub mod generator;
pub mod password;

pub use cipher::{CardCipher, DecryptedPayload, EncryptedPayload, KdfParams};
pub use generator::{CardGenerator, CardOptions, ClassicCardGenerator, GeneratedCard};
