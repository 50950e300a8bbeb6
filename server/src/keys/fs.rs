//! Filesystem key loader.

use std::path::Path;

use async_trait::async_trait;
use rsa::RsaPrivateKey;

use super::{KeyLoadError, KeyLoader, decode_rsa_key};

/// Reads a PEM file from local disk. Paths may carry a `file://` prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

#[async_trait]
impl KeyLoader for FsLoader {
    async fn load(&self, path: &str) -> Result<RsaPrivateKey, KeyLoadError> {
        let path = path.strip_prefix("file://").unwrap_or(path);
        if !Path::new(path).exists() {
            return Err(KeyLoadError::NotFound(path.to_string()));
        }

        tracing::info!(key_path = path, "Loading key");
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| KeyLoadError::Io {
                path: path.to_string(),
                source,
            })?;

        decode_rsa_key(&raw)
    }
}
