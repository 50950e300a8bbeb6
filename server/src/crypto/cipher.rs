//! Hybrid card encryption.
//!
//! Each card body is sealed under a key derived from its own passphrase, and
//! the passphrase itself is wrapped with the process RSA public key. Only a
//! holder of the private key can recover the passphrase, and only the
//! passphrase opens the body.
//!
//! # Layout
//!
//! `ciphertext` is `base64(salt[16] || nonce[12] || chacha20poly1305(body) || tag[16])`.
//! `wrapped_key` is `base64(rsa_oaep_sha512(passphrase))`.
//! Both use the standard alphabet with padding.
//!
//! # Invariants
//! - `decrypt(encrypt(p, k)) == (p, k)` for every accepted `(p, k)`.
//! - Encryption never returns one half of the pair without the other.
//! - Decrypt failures are opaque: wrong key, corrupted wrap and tampered body
//!   all surface as the same `DecryptionError`.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, AeadCore, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::RngCore;
use rsa::Oaep;
use sha2::{Digest, Sha512};

use crate::error::ServiceError;
use crate::keys::KeyMaterial;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
const DERIVED_KEY_LEN: usize = 32;

/// Argon2id cost parameters used to stretch card passphrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    /// Argon2id parameters for these costs, or why Argon2 rejects them.
    pub fn to_argon2(&self) -> Result<Params, argon2::Error> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(DERIVED_KEY_LEN),
        )
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Output of [`CardCipher::encrypt`]. Both fields are base64 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub wrapped_key: String,
}

/// Output of [`CardCipher::decrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedPayload {
    pub plaintext: String,
    pub passphrase: String,
}

/// Encrypts and decrypts card bodies with the process key pair.
///
/// Cloning is cheap; the key material is shared.
#[derive(Debug, Clone)]
pub struct CardCipher {
    keys: Arc<KeyMaterial>,
    kdf: KdfParams,
}

impl CardCipher {
    #[must_use]
    pub const fn new(keys: Arc<KeyMaterial>, kdf: KdfParams) -> Self {
        Self { keys, kdf }
    }

    /// Largest passphrase (in bytes) that RSA-OAEP with SHA-512 can wrap
    /// under the loaded modulus.
    #[must_use]
    pub fn max_passphrase_len(&self) -> usize {
        self.keys
            .modulus_bytes()
            .saturating_sub(2 * <Sha512 as Digest>::output_size() + 2)
    }

    /// Seal `plaintext` under `passphrase` and wrap the passphrase.
    pub fn encrypt(
        &self,
        plaintext: &str,
        passphrase: &str,
    ) -> Result<EncryptedPayload, ServiceError> {
        if passphrase.len() > self.max_passphrase_len() {
            return Err(ServiceError::encryption(format!(
                "passphrase is {} bytes, limit is {}",
                passphrase.len(),
                self.max_passphrase_len()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        let key = self
            .derive_key(passphrase.as_bytes(), &salt)
            .map_err(ServiceError::encryption)?;

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = ChaCha20Poly1305::new(Key::from_slice(&key))
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(ServiceError::encryption)?;

        let mut body = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
        body.extend_from_slice(&salt);
        body.extend_from_slice(nonce.as_slice());
        body.extend_from_slice(&sealed);

        let wrapped = self
            .keys
            .public_key()
            .encrypt(
                &mut rsa::rand_core::OsRng,
                Oaep::new::<Sha512>(),
                passphrase.as_bytes(),
            )
            .map_err(ServiceError::encryption)?;

        Ok(EncryptedPayload {
            ciphertext: STANDARD.encode(body),
            wrapped_key: STANDARD.encode(wrapped),
        })
    }

    /// Unwrap the passphrase and open the body.
    pub fn decrypt(
        &self,
        ciphertext: &str,
        wrapped_key: &str,
    ) -> Result<DecryptedPayload, ServiceError> {
        let body = STANDARD.decode(ciphertext).map_err(ServiceError::decoding)?;
        let wrapped = STANDARD.decode(wrapped_key).map_err(ServiceError::decoding)?;

        let passphrase = self
            .keys
            .private_key()
            .decrypt(Oaep::new::<Sha512>(), &wrapped)
            .map_err(ServiceError::decryption)?;

        if body.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(ServiceError::decryption("ciphertext is truncated"));
        }
        let (salt, rest) = body.split_at(SALT_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);

        let key = self
            .derive_key(&passphrase, salt)
            .map_err(ServiceError::decryption)?;
        let plaintext = ChaCha20Poly1305::new(Key::from_slice(&key))
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(ServiceError::decryption)?;

        Ok(DecryptedPayload {
            plaintext: String::from_utf8(plaintext).map_err(ServiceError::decryption)?,
            passphrase: String::from_utf8(passphrase).map_err(ServiceError::decryption)?,
        })
    }

    fn derive_key(
        &self,
        passphrase: &[u8],
        salt: &[u8],
    ) -> Result<[u8; DERIVED_KEY_LEN], argon2::Error> {
        let params = self.kdf.to_argon2()?;
        let mut key = [0u8; DERIVED_KEY_LEN];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase, salt, &mut key)?;
        Ok(key)
    }
}
