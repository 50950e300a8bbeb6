//! Server configuration module.
//!
//! Configuration is loaded from environment variables once at startup.
//!
//! # Environment Variables
//!
//! - `CONFETTI_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `CONFETTI_ACCESS_TOKEN_TTL`: Access token lifetime (default: `1h`)
//! - `CONFETTI_REFRESH_TOKEN_TTL`: Refresh token lifetime (default: `4320h`)
//! - `CONFETTI_PRIVATE_KEY`: Path or object key of the RSA private key (required)
//! - `CONFETTI_KEY_LOADER`: `fs` (default) or `block` to read the key from object storage
//! - `CONFETTI_SPACES_ENDPOINT`, `CONFETTI_SPACES_REGION`, `CONFETTI_SPACES_KEY`,
//!   `CONFETTI_SPACES_SECRET`, `CONFETTI_KEYS_BUCKET`: object storage settings,
//!   required when the `block` loader is selected
//! - `CONFETTI_KDF_MEMORY_KIB`, `CONFETTI_KDF_ITERATIONS`, `CONFETTI_KDF_PARALLELISM`:
//!   Argon2 tuning for card encryption
//! - `CONFETTI_APP_HOST`: host used in links mailed to users (default: `localhost:3000`)
//! - `CONFETTI_ADMIN_EMAILS`: comma separated addresses that register as admins
//!
//! Durations use the `1h30m15s` notation.
//!
//! # Invariants
//!
//! - Token lifetimes are always strictly positive.
//! - `remote` is `Some` exactly when `key_loader` is [`LoaderKind::Remote`].
//! - `kdf` is accepted by Argon2, so card encryption cannot fail on its costs.

use std::time::Duration;

use crate::crypto::cipher::KdfParams;
use crate::keys::LoaderKind;

/// Object storage settings for the remote key loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKeyConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Lifetime of bearer access tokens.
    pub access_token_ttl: Duration,
    /// Lifetime of refresh tokens (and their cookie).
    pub refresh_token_ttl: Duration,
    /// Location of the PEM-encoded RSA private key, interpreted by the loader.
    pub private_key: String,
    /// Which key loader reads `private_key`.
    pub key_loader: LoaderKind,
    /// Object storage settings, present for the remote loader.
    pub remote: Option<RemoteKeyConfig>,
    /// Key derivation parameters for card encryption.
    pub kdf: KdfParams,
    /// Host part of confirmation and password reset links.
    pub app_host: String,
    /// Accounts registered with one of these addresses are admins.
    pub admin_emails: Vec<String>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default access token lifetime.
    pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
    /// Default refresh token lifetime (180 days).
    pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(4320 * 60 * 60);
    /// Default bucket region for the remote loader.
    pub const DEFAULT_REGION: &'static str = "us-east-1";
    /// Default host for mailed links.
    pub const DEFAULT_APP_HOST: &'static str = "localhost:3000";

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let listen_port = match get("CONFETTI_LISTEN_PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "CONFETTI_LISTEN_PORT".to_string(),
                message: format!("'{value}' is not a valid port number (must be 1-65535)"),
            })?,
            None => Self::DEFAULT_PORT,
        };

        let access_token_ttl = load_duration(
            "CONFETTI_ACCESS_TOKEN_TTL",
            get("CONFETTI_ACCESS_TOKEN_TTL"),
            Self::DEFAULT_ACCESS_TOKEN_TTL,
        )?;
        let refresh_token_ttl = load_duration(
            "CONFETTI_REFRESH_TOKEN_TTL",
            get("CONFETTI_REFRESH_TOKEN_TTL"),
            Self::DEFAULT_REFRESH_TOKEN_TTL,
        )?;

        let private_key = get("CONFETTI_PRIVATE_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("CONFETTI_PRIVATE_KEY".to_string()))?;

        let key_loader = match get("CONFETTI_KEY_LOADER") {
            Some(value) => value
                .parse::<LoaderKind>()
                .map_err(|message| ConfigError::InvalidValue {
                    name: "CONFETTI_KEY_LOADER".to_string(),
                    message,
                })?,
            None => LoaderKind::Filesystem,
        };

        let remote = match key_loader {
            LoaderKind::Filesystem => None,
            LoaderKind::Remote => {
                let required = |name: &str| {
                    get(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
                };
                Some(RemoteKeyConfig {
                    endpoint: required("CONFETTI_SPACES_ENDPOINT")?,
                    region: get("CONFETTI_SPACES_REGION")
                        .unwrap_or_else(|| Self::DEFAULT_REGION.to_string()),
                    access_key: required("CONFETTI_SPACES_KEY")?,
                    secret_key: required("CONFETTI_SPACES_SECRET")?,
                    bucket: required("CONFETTI_KEYS_BUCKET")?,
                })
            }
        };

        let defaults = KdfParams::default();
        let kdf = KdfParams {
            memory_kib: load_u32(
                "CONFETTI_KDF_MEMORY_KIB",
                get("CONFETTI_KDF_MEMORY_KIB"),
                defaults.memory_kib,
            )?,
            iterations: load_u32(
                "CONFETTI_KDF_ITERATIONS",
                get("CONFETTI_KDF_ITERATIONS"),
                defaults.iterations,
            )?,
            parallelism: load_u32(
                "CONFETTI_KDF_PARALLELISM",
                get("CONFETTI_KDF_PARALLELISM"),
                defaults.parallelism,
            )?,
        };
        validate_kdf(&kdf)?;

        let app_host =
            get("CONFETTI_APP_HOST").unwrap_or_else(|| Self::DEFAULT_APP_HOST.to_string());
        let admin_emails = get("CONFETTI_ADMIN_EMAILS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            listen_port,
            access_token_ttl,
            refresh_token_ttl,
            private_key,
            key_loader,
            remote,
            kdf,
            app_host,
            admin_emails,
        })
    }
}

fn load_duration(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let duration = parse_duration(&value).map_err(|message| ConfigError::InvalidValue {
        name: name.to_string(),
        message,
    })?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "duration must be positive".to_string(),
        });
    }
    Ok(duration)
}

/// Reject Argon2 costs at startup instead of on the first card write.
fn validate_kdf(kdf: &KdfParams) -> Result<(), ConfigError> {
    kdf.to_argon2().map(|_| ()).map_err(|e| {
        let name = match e {
            argon2::Error::ThreadsTooFew | argon2::Error::ThreadsTooMany => {
                "CONFETTI_KDF_PARALLELISM"
            }
            argon2::Error::TimeTooSmall => "CONFETTI_KDF_ITERATIONS",
            _ => "CONFETTI_KDF_MEMORY_KIB",
        };
        ConfigError::InvalidValue {
            name: name.to_string(),
            message: e.to_string(),
        }
    })
}

fn load_u32(name: &str, value: Option<String>, default: u32) -> Result<u32, ConfigError> {
    value.map_or(Ok(default), |value| {
        value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a non-negative integer"),
        })
    })
}

/// Parse a duration such as `1h`, `90m`, `1h30m` or `45s`.
///
/// Units may appear in any order but each number must be followed by one of
/// `h`, `m` or `s`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration is empty".to_string());
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let multiplier = match ch {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            other => return Err(format!("unknown unit '{other}' in '{input}'")),
        };
        if digits.is_empty() {
            return Err(format!("missing number before '{ch}' in '{input}'"));
        }
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("number too large in '{input}'"))?;
        total = amount
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("duration overflows in '{input}'"))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("missing unit after '{digits}' in '{input}'"));
    }

    Ok(Duration::from_secs(total))
}
