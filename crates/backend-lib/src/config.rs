// ============================
// smartfarm-backend/src/config.rs
// ============================
//! Configuration management.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Environment variable prefix, nested keys split on `__`
/// (e.g. `SMARTFARM_AUTH__JWT_SECRET`).
pub const ENV_PREFIX: &str = "SMARTFARM_";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Minimum accepted signing secret length in bytes
pub const MIN_SECRET_BYTES: usize = 32;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("auth.jwt_secret is not set")]
    MissingSecret,

    #[error("auth.jwt_secret must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,
}

/// String that never shows up in `Debug` output
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub mail: MailSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server bind address
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// Token, hashing and password policy settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret; required at startup
    pub jwt_secret: Option<Secret>,
    /// Session token lifetime in seconds
    pub session_ttl_secs: u64,
    /// Password reset token lifetime in seconds
    pub reset_ttl_secs: u64,
    /// Email verification code lifetime in seconds
    pub verification_ttl_secs: u64,
    /// scrypt cost (`log2(N)`)
    pub hash_cost: u8,
    /// Minimum password length
    pub min_password_length: usize,
    /// Answer unknown-account and wrong-password alike
    pub conceal_account_existence: bool,
    /// Link embedded in reset mails; the token is appended as `?token=`
    pub reset_url_base: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            session_ttl_secs: 60 * 60 * 24, // 24 hours
            reset_ttl_secs: 60 * 60,       // 1 hour
            verification_ttl_secs: 60 * 10,
            hash_cost: crate::auth::password::DEFAULT_COST,
            min_password_length: 6,
            conceal_account_existence: false,
            reset_url_base: "http://localhost:3000/resetpwd".to_string(),
        }
    }
}

impl AuthSettings {
    /// Signing key bytes. A missing or short secret fails here, at startup.
    pub fn signing_key(&self) -> Result<Zeroizing<Vec<u8>>, ConfigError> {
        let secret = self
            .jwt_secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        if secret.expose().len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret);
        }
        Ok(Zeroizing::new(secret.expose().as_bytes().to_vec()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data directory for the flat-file backend
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from("data"),
        }
    }
}

/// SMTP settings. With `enabled = false` mails are only logged.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret,
    /// Sender address; defaults to `username`
    pub from: Option<String>,
    /// Where suggestion-box mails are delivered; defaults to the sender
    pub operator_address: Option<String>,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "smtp.naver.com".to_string(),
            port: 465,
            username: String::new(),
            password: Secret::default(),
            from: None,
            operator_address: None,
            timeout_secs: 10,
            retry_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl MailSettings {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }

    pub fn operator(&self) -> &str {
        self.operator_address.as_deref().unwrap_or_else(|| self.sender())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Fallback filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of the pretty formatter
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from an explicit TOML file, environment taking precedence
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log.level
            )));
        }
        if self.auth.session_ttl_secs == 0 || self.auth.reset_ttl_secs == 0 {
            return Err(ConfigError::Invalid("token TTLs must be positive".into()));
        }
        if self.auth.verification_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "verification code TTL must be positive".into(),
            ));
        }
        if !(1..=20).contains(&self.auth.hash_cost) {
            return Err(ConfigError::Invalid("hash_cost must be within 1..=20".into()));
        }
        if self.auth.min_password_length < 4 {
            return Err(ConfigError::Invalid(
                "min_password_length must be at least 4".into(),
            ));
        }
        if self.mail.enabled && self.mail.username.is_empty() {
            return Err(ConfigError::Invalid(
                "mail.username is required when mail is enabled".into(),
            ));
        }
        Ok(())
    }
}
