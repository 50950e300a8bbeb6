//! Object storage key loader (S3-compatible, e.g. DigitalOcean Spaces or MinIO).

use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use rsa::RsaPrivateKey;

use super::{KeyLoadError, KeyLoader, decode_rsa_key};
use crate::config::RemoteKeyConfig;

/// Reads the key object from a bucket. The loader path is the object key.
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl RemoteLoader {
    pub fn new(config: &RemoteKeyConfig) -> Result<Self, KeyLoadError> {
        let store = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_bucket_name(&config.bucket)
            .with_allow_http(config.endpoint.starts_with("http://"))
            .build()
            .map_err(|e| KeyLoadError::InvalidConfig(e.to_string()))?;

        Ok(Self::with_store(Arc::new(store), config.bucket.clone()))
    }

    /// Use an already constructed store.
    #[must_use]
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }
}

#[async_trait]
impl KeyLoader for RemoteLoader {
    async fn load(&self, path: &str) -> Result<RsaPrivateKey, KeyLoadError> {
        tracing::info!(key_path = path, bucket = %self.bucket, "Loading key");

        let location = ObjectPath::from(path);
        let raw = match self.store.get(&location).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(KeyLoadError::NotFound(format!("{}/{path}", self.bucket)));
            }
            Err(e) => return Err(e.into()),
        };

        decode_rsa_key(&raw)
    }
}
