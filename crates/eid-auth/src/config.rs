//! Authentication configuration.
//!
//! Configuration types for session lifetimes, token signing and the two
//! identity providers. Durations are written in humantime notation (`"5m"`,
//! `"24h"`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for access and refresh token lifetimes (ten years).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://auth.example.com"
/// session_ttl = "5m"
/// access_token_lifetime = "30m"
///
/// [auth.signing]
/// algorithm = "ES384"
///
/// [auth.mobile_id]
/// base_url = "https://tsp.demo.sk.ee/mid-api"
/// relying_party_uuid = "00000000-0000-0000-0000-000000000000"
/// relying_party_name = "DEMO"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token issuer (used in the `iss` claim).
    pub issuer: String,

    /// Time-to-live of a session record, reset on every write.
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Smart-ID provider configuration.
    pub smart_id: SmartIdConfig,

    /// Mobile-ID provider configuration.
    pub mobile_id: MobileIdConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            session_ttl: Duration::from_secs(5 * 60),
            access_token_lifetime: Duration::from_secs(30 * 60),
            refresh_token_lifetime: Duration::from_secs(24 * 3600),
            signing: SigningConfig::default(),
            smart_id: SmartIdConfig::default(),
            mobile_id: MobileIdConfig::default(),
        }
    }
}

/// Token signing configuration.
///
/// When no key material is configured a key is generated at startup. Tokens
/// signed with a generated key do not survive a restart.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm.
    /// Supported: "HS256", "RS256", "RS384", "ES384"
    pub algorithm: String,

    /// Shared secret for HS256.
    pub secret: Option<String>,

    /// PEM-encoded private key for RS256/RS384/ES384.
    pub private_key_pem: Option<String>,

    /// PEM-encoded public key for RS256/RS384.
    pub public_key_pem: Option<String>,

    /// Key ID placed in the JWT header and JWKS.
    pub kid: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "RS256".to_string(),
            secret: None,
            private_key_pem: None,
            public_key_pem: None,
            kid: None,
        }
    }
}

impl SigningConfig {
    /// Returns `true` if no key material is configured for the algorithm.
    #[must_use]
    pub fn needs_generated_key(&self) -> bool {
        match self.algorithm.as_str() {
            "HS256" => self.secret.is_none(),
            _ => self.private_key_pem.is_none(),
        }
    }
}

/// Smart-ID provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SmartIdConfig {
    /// Enable the Smart-ID provider.
    pub enabled: bool,

    /// Relying party API base URL.
    pub base_url: String,

    /// Relying party UUID issued by the provider.
    pub relying_party_uuid: String,

    /// Relying party name issued by the provider.
    pub relying_party_name: String,

    /// Text shown on the user's device (max 60 characters).
    pub display_text: String,

    /// Required certificate level ("QUALIFIED" or "ADVANCED").
    pub certificate_level: String,

    /// Long-poll timeout of a single status request.
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,

    /// Number of polling workers.
    pub workers: usize,

    /// Capacity of the polling queue.
    pub queue_capacity: usize,
}

impl Default for SmartIdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://sid.demo.sk.ee/smart-id-rp/v2".to_string(),
            relying_party_uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            relying_party_name: "DEMO".to_string(),
            display_text: "Log in".to_string(),
            certificate_level: "QUALIFIED".to_string(),
            poll_timeout: Duration::from_secs(30),
            workers: 10,
            queue_capacity: 1000,
        }
    }
}

/// Mobile-ID provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MobileIdConfig {
    /// Enable the Mobile-ID provider.
    pub enabled: bool,

    /// Relying party API base URL.
    pub base_url: String,

    /// Relying party UUID issued by the provider.
    pub relying_party_uuid: String,

    /// Relying party name issued by the provider.
    pub relying_party_name: String,

    /// Text shown on the user's phone.
    pub display_text: String,

    /// Language of the phone prompt ("EST", "ENG", "RUS", "LIT").
    pub language: String,

    /// Long-poll timeout of a single status request.
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,

    /// Number of polling workers.
    pub workers: usize,

    /// Capacity of the polling queue.
    pub queue_capacity: usize,
}

impl Default for MobileIdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://tsp.demo.sk.ee/mid-api".to_string(),
            relying_party_uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            relying_party_name: "DEMO".to_string(),
            display_text: "Log in".to_string(),
            language: "EST".to_string(),
            poll_timeout: Duration::from_secs(30),
            workers: 10,
            queue_capacity: 1000,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - A lifetime or TTL is zero
    /// - A token lifetime exceeds [`MAX_TOKEN_LIFETIME`]
    /// - The signing algorithm is not supported or the key material does not
    ///   match it
    /// - An enabled provider has no workers, queue capacity or poll timeout
    ///
    /// Returns `ConfigError::Missing` if an enabled provider lacks its base
    /// URL or relying party fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("session_ttl", self.session_ttl),
            ("access_token_lifetime", self.access_token_lifetime),
            ("refresh_token_lifetime", self.refresh_token_lifetime),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
        }

        for (name, value) in [
            ("access_token_lifetime", self.access_token_lifetime),
            ("refresh_token_lifetime", self.refresh_token_lifetime),
        ] {
            if value > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be at most {}s",
                    MAX_TOKEN_LIFETIME.as_secs()
                )));
            }
        }

        self.validate_signing()?;

        if self.smart_id.enabled {
            let p = &self.smart_id;
            validate_provider(
                "smart_id",
                &p.base_url,
                &p.relying_party_uuid,
                &p.relying_party_name,
                p.poll_timeout,
                p.workers,
                p.queue_capacity,
            )?;
            if p.display_text.chars().count() > 60 {
                return Err(ConfigError::InvalidValue(
                    "smart_id.display_text must be at most 60 characters".to_string(),
                ));
            }
        }

        if self.mobile_id.enabled {
            let p = &self.mobile_id;
            validate_provider(
                "mobile_id",
                &p.base_url,
                &p.relying_party_uuid,
                &p.relying_party_name,
                p.poll_timeout,
                p.workers,
                p.queue_capacity,
            )?;
        }

        Ok(())
    }

    fn validate_signing(&self) -> Result<(), ConfigError> {
        let signing = &self.signing;
        match signing.algorithm.as_str() {
            "HS256" => {
                if signing.private_key_pem.is_some() || signing.public_key_pem.is_some() {
                    return Err(ConfigError::InvalidValue(
                        "HS256 uses signing.secret, not PEM keys".to_string(),
                    ));
                }
                if signing.secret.as_deref().is_some_and(str::is_empty) {
                    return Err(ConfigError::InvalidValue(
                        "signing.secret cannot be empty".to_string(),
                    ));
                }
            }
            "RS256" | "RS384" | "ES384" => {
                if signing.secret.is_some() {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} uses PEM keys, not signing.secret",
                        signing.algorithm
                    )));
                }
                let rsa = signing.algorithm != "ES384";
                if rsa && signing.private_key_pem.is_some() != signing.public_key_pem.is_some() {
                    return Err(ConfigError::Missing(
                        "signing.private_key_pem and signing.public_key_pem must be set together"
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid signing algorithm: '{}'. Must be HS256, RS256, RS384, or ES384",
                    other
                )));
            }
        }
        Ok(())
    }
}

fn validate_provider(
    name: &str,
    base_url: &str,
    relying_party_uuid: &str,
    relying_party_name: &str,
    poll_timeout: Duration,
    workers: usize,
    queue_capacity: usize,
) -> Result<(), ConfigError> {
    if base_url.is_empty() {
        return Err(ConfigError::Missing(format!("{name}.base_url")));
    }
    if url::Url::parse(base_url).is_err() {
        return Err(ConfigError::InvalidValue(format!(
            "{name}.base_url is not a valid URL: {base_url}"
        )));
    }
    if relying_party_uuid.is_empty() {
        return Err(ConfigError::Missing(format!("{name}.relying_party_uuid")));
    }
    if relying_party_name.is_empty() {
        return Err(ConfigError::Missing(format!("{name}.relying_party_name")));
    }
    if poll_timeout.is_zero() {
        return Err(ConfigError::InvalidValue(format!(
            "{name}.poll_timeout must be > 0"
        )));
    }
    if workers == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{name}.workers must be > 0"
        )));
    }
    if queue_capacity == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{name}.queue_capacity must be > 0"
        )));
    }
    Ok(())
}
