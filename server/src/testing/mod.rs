//! Shared fixtures for unit and end-to-end tests.
//!
//! Keys are fixed PEM files under `testdata/` so no test has to generate RSA
//! keys, and Argon2 runs with minimal cost.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{TokenAuthority, TokenSettings};
use crate::config::ServerConfig;
use crate::crypto::{CardCipher, ClassicCardGenerator, KdfParams};
use crate::http::AppState;
use crate::keys::{KeyMaterial, LoaderKind};
use crate::mailer::{MailMessage, Mailer, MailerError};
use crate::services::{AccountSettings, AuthService, CardService};
use crate::store::MemoryStore;
use crate::time::TimeSource;

pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../../testdata/private_key.pem");
pub const TEST_PRIVATE_KEY_PKCS8_PEM: &str = include_str!("../../testdata/private_key_pkcs8.pem");
pub const TEST_OTHER_PRIVATE_KEY_PEM: &str = include_str!("../../testdata/other_private_key.pem");

/// 2023-11-14T22:13:20Z
pub const TEST_NOW: u64 = 1_700_000_000;

pub const TEST_APP_HOST: &str = "confetti.test";
/// Registering with this address yields an admin.
pub const TEST_ADMIN_EMAIL: &str = "admin@b.com";

/// Keeps every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, MailMessage)>>,
}

impl RecordingMailer {
    /// Recipient and message for everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<(String, MailMessage)> {
        self.sent.lock().expect("mailer lock").clone()
    }

    /// The code at the end of the link in the newest mail to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(recipient, _)| recipient == to)
            .and_then(|(_, message)| {
                message
                    .body
                    .trim_end()
                    .rsplit('/')
                    .next()
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage, to: &str) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((to.to_string(), message.clone()));
        Ok(())
    }
}

pub fn test_kdf_params() -> KdfParams {
    KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn test_key_material() -> KeyMaterial {
    KeyMaterial::from_pem(TEST_PRIVATE_KEY_PEM).expect("test key decodes")
}

pub fn test_other_key_material() -> KeyMaterial {
    KeyMaterial::from_pem(TEST_OTHER_PRIVATE_KEY_PEM).expect("second test key decodes")
}

pub fn test_cipher() -> CardCipher {
    CardCipher::new(Arc::new(test_key_material()), test_kdf_params())
}

pub fn test_token_settings() -> TokenSettings {
    TokenSettings {
        access_ttl: ServerConfig::DEFAULT_ACCESS_TOKEN_TTL,
        refresh_ttl: ServerConfig::DEFAULT_REFRESH_TOKEN_TTL,
    }
}

pub fn test_authority(clock: Arc<dyn TimeSource>) -> TokenAuthority {
    TokenAuthority::new(&test_key_material(), test_token_settings(), clock)
        .expect("token authority")
}

pub fn test_card_service() -> (CardService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = CardService::new(
        test_cipher(),
        store.clone(),
        Arc::new(ClassicCardGenerator),
    );
    (service, store)
}

pub fn test_account_settings() -> AccountSettings {
    AccountSettings {
        app_host: TEST_APP_HOST.to_string(),
        admin_emails: vec![TEST_ADMIN_EMAIL.to_string()],
    }
}

pub fn test_auth_service(clock: Arc<dyn TimeSource>) -> (AuthService, Arc<MemoryStore>) {
    let (service, store, _) = test_auth_service_with_mailer(clock);
    (service, store)
}

pub fn test_auth_service_with_mailer(
    clock: Arc<dyn TimeSource>,
) -> (AuthService, Arc<MemoryStore>, Arc<RecordingMailer>) {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let service = AuthService::new(
        store.clone(),
        store.clone(),
        Arc::new(test_authority(clock.clone())),
        mailer.clone(),
        clock,
        test_account_settings(),
    );
    (service, store, mailer)
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        listen_port: 0,
        access_token_ttl: Duration::from_secs(3600),
        refresh_token_ttl: Duration::from_secs(4320 * 3600),
        private_key: "testdata/private_key.pem".to_string(),
        key_loader: LoaderKind::Filesystem,
        remote: None,
        kdf: test_kdf_params(),
        app_host: TEST_APP_HOST.to_string(),
        admin_emails: vec![TEST_ADMIN_EMAIL.to_string()],
    }
}

pub fn test_app_state(clock: Arc<dyn TimeSource>, mailer: Arc<dyn Mailer>) -> AppState {
    AppState::build(Arc::new(test_key_material()), &test_config(), clock, mailer)
        .expect("app state")
}
