//! RSA key material and the loaders that produce it.
//!
//! The process owns exactly one [`KeyMaterial`], loaded once before the
//! listener binds and shared read-only by the card cipher and the token
//! authority.
//!
//! # Pre-conditions
//! - The configured key must be a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
//!
//! # Invariants
//! - `KeyMaterial` is immutable after construction.
//! - The public key is always derived from the private key, never loaded separately.

mod fs;
mod remote;

use std::str::FromStr;

use async_trait::async_trait;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::config::ServerConfig;

pub use fs::FsLoader;
pub use remote::RemoteLoader;

/// Errors that can occur while loading the private key.
#[derive(Debug, thiserror::Error)]
pub enum KeyLoadError {
    /// The key file does not exist.
    #[error("key file not found: {0}")]
    NotFound(String),
    /// The key file exists but could not be read.
    #[error("unable to read key {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The object store rejected the request.
    #[error("unable to fetch key object: {0}")]
    Remote(#[from] object_store::Error),
    /// The bytes are not a usable RSA private key.
    #[error("unable to decode RSA private key: {0}")]
    Decode(String),
    /// The loader is missing settings it needs.
    #[error("invalid key loader configuration: {0}")]
    InvalidConfig(String),
}

/// Which loader reads the configured private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    /// Read a PEM file from the local filesystem.
    Filesystem,
    /// Read a PEM object from S3-compatible block storage.
    Remote,
}

impl FromStr for LoaderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fs" | "file" | "filesystem" => Ok(Self::Filesystem),
            "block" | "remote" | "s3" => Ok(Self::Remote),
            other => Err(format!("unknown key loader '{other}' (expected 'fs' or 'block')")),
        }
    }
}

/// Source of the process private key.
#[async_trait]
pub trait KeyLoader: Send + Sync {
    /// Load and decode the private key stored at `path`.
    async fn load(&self, path: &str) -> Result<RsaPrivateKey, KeyLoadError>;
}

/// Build the loader selected by configuration.
pub fn loader_for(config: &ServerConfig) -> Result<Box<dyn KeyLoader>, KeyLoadError> {
    match config.key_loader {
        LoaderKind::Filesystem => Ok(Box::new(FsLoader)),
        LoaderKind::Remote => {
            let remote = config.remote.as_ref().ok_or_else(|| {
                KeyLoadError::InvalidConfig("object storage settings are missing".to_string())
            })?;
            Ok(Box::new(RemoteLoader::new(remote)?))
        }
    }
}

/// Decode a PEM-encoded RSA private key, accepting PKCS#1 and PKCS#8 framing.
pub fn decode_rsa_key(raw: &[u8]) -> Result<RsaPrivateKey, KeyLoadError> {
    let pem = std::str::from_utf8(raw)
        .map_err(|_| KeyLoadError::Decode("key is not valid UTF-8 PEM".to_string()))?;

    let key = RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| KeyLoadError::Decode(e.to_string()))?;
    key.validate()
        .map_err(|e| KeyLoadError::Decode(e.to_string()))?;

    Ok(key)
}

/// The process RSA key pair.
pub struct KeyMaterial {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl KeyMaterial {
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            private_key,
            public_key,
        }
    }

    pub fn from_pem(pem: &str) -> Result<Self, KeyLoadError> {
        decode_rsa_key(pem.as_bytes()).map(Self::new)
    }

    #[must_use]
    pub const fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    #[must_use]
    pub const fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Modulus size in bytes.
    #[must_use]
    pub fn modulus_bytes(&self) -> usize {
        self.public_key.size()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("modulus_bits", &(self.modulus_bytes() * 8))
            .finish_non_exhaustive()
    }
}
